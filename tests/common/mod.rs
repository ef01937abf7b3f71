//! Shared capture builders and plugtest-style test cases for integration tests

#![allow(dead_code)]

use coapscope::check::{CheckResult, Checker, MessageTemplate, Sender, TestCase, TestCaseRegistry};
use coapscope::codec::{BlockValue, CoapMessage, CoapOption, Code, MessageType, OptionKind};
use coapscope::types::Frame;
use coapscope::Verdict;
use std::net::SocketAddr;

pub fn client() -> SocketAddr {
    "10.0.0.1:40000".parse().unwrap()
}

pub fn server() -> SocketAddr {
    "10.0.0.2:5683".parse().unwrap()
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds a frame sequence with consecutive ids and a 10ms clock.
#[derive(Debug, Default)]
pub struct CaptureBuilder {
    frames: Vec<Frame>,
    clock: f64,
}

impl CaptureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        self.frames.len() as u64 + 1
    }

    fn tick(&mut self) -> f64 {
        self.clock += 0.01;
        self.clock
    }

    pub fn send(mut self, source: SocketAddr, destination: SocketAddr, message: CoapMessage) -> Self {
        let (id, timestamp) = (self.next_id(), self.tick());
        self.frames.push(Frame::new(id, timestamp, source, destination, message));
        self
    }

    /// Client to server.
    pub fn request(self, message: CoapMessage) -> Self {
        self.send(client(), server(), message)
    }

    /// Server to client.
    pub fn reply(self, message: CoapMessage) -> Self {
        self.send(server(), client(), message)
    }

    /// Raw datagram from client to server, decoded like a dissector would.
    pub fn datagram(mut self, bytes: &[u8]) -> Self {
        let (id, timestamp) = (self.next_id(), self.tick());
        self.frames.push(Frame::from_datagram(id, timestamp, client(), server(), bytes));
        self
    }

    /// Undecodable junk on the same flow.
    pub fn noise(self) -> Self {
        self.datagram(&[0xFF, 0x00])
    }

    pub fn wait(mut self, seconds: f64) -> Self {
        self.clock += seconds;
        self
    }

    pub fn build(self) -> Vec<Frame> {
        self.frames
    }
}

pub fn con(code: Code, message_id: u16, token: u8, path: &str) -> CoapMessage {
    CoapMessage::new(MessageType::Confirmable, code, message_id).with_token([token]).with_uri_path(path)
}

pub fn ack(code: Code, message_id: u16, token: u8) -> CoapMessage {
    CoapMessage::new(MessageType::Acknowledgement, code, message_id).with_token([token])
}

pub fn empty(mtype: MessageType, message_id: u16) -> CoapMessage {
    CoapMessage::new(mtype, Code::EMPTY, message_id)
}

pub fn observe(message: CoapMessage, sequence: u32) -> CoapMessage {
    message.with_option(CoapOption::uint(OptionKind::Observe, sequence))
}

pub fn block1(message: CoapMessage, num: u32, more: bool) -> CoapMessage {
    message.with_option(CoapOption::uint(OptionKind::Block1, BlockValue::new(num, more, 2).to_uint()))
}

pub fn block2(message: CoapMessage, num: u32, more: bool) -> CoapMessage {
    message.with_option(CoapOption::uint(OptionKind::Block2, BlockValue::new(num, more, 2).to_uint()))
}

fn current_token(checker: &Checker<'_>) -> Vec<u8> {
    checker.message().map(|message| message.token().to_vec()).unwrap_or_default()
}

/// GET on `/test` answered with 2.05 Content.
pub struct GetTest;

impl TestCase for GetTest {
    fn id(&self) -> &str {
        "TD_COAP_CORE_01"
    }

    fn objective(&self) -> &str {
        "Perform GET transaction (CON mode)"
    }

    fn run(&self, checker: &mut Checker<'_>) -> CheckResult {
        let request = MessageTemplate::new()
            .mtype(MessageType::Confirmable)
            .code(Code::GET)
            .option_string(OptionKind::UriPath, "test");
        checker.match_frame(Sender::Client, &request, Some(Verdict::Inconclusive))?;
        let token = current_token(checker);

        checker.advance_skip_empty_ack()?;
        let response = MessageTemplate::new().code(Code::CONTENT).token(token);
        checker.match_frame(Sender::Server, &response, Some(Verdict::Fail))?;
        Ok(())
    }
}

/// Observation on `/obs`: registration, notifications and their acknowledgements.
pub struct ObserveTest;

impl TestCase for ObserveTest {
    fn id(&self) -> &str {
        "TD_COAP_OBS_01"
    }

    fn objective(&self) -> &str {
        "Handle resource observation"
    }

    fn run(&self, checker: &mut Checker<'_>) -> CheckResult {
        let register = MessageTemplate::new()
            .code(Code::GET)
            .option_string(OptionKind::UriPath, "obs")
            .option_present(OptionKind::Observe);
        checker.match_frame(Sender::Client, &register, Some(Verdict::Inconclusive))?;

        let notification = MessageTemplate::new().code(Code::CONTENT).option_present(OptionKind::Observe);
        checker.advance()?;
        checker.match_frame(Sender::Server, &notification, Some(Verdict::Fail))?;

        let acknowledgement = MessageTemplate::new().mtype(MessageType::Acknowledgement).code(Code::EMPTY);
        while checker.advance_optional() {
            let from_server = checker.frame().is_some_and(|frame| frame.source == checker.server());
            if from_server {
                checker.match_frame(Sender::Server, &notification, Some(Verdict::Fail))?;
            } else {
                checker.match_frame(Sender::Client, &acknowledgement, Some(Verdict::Fail))?;
            }
        }
        Ok(())
    }
}

/// Block-wise GET of `/large`.
pub struct Block2Test;

impl TestCase for Block2Test {
    fn id(&self) -> &str {
        "TD_COAP_BLOCK_01"
    }

    fn objective(&self) -> &str {
        "Handle GET blockwise transfer for large resource"
    }

    fn run(&self, checker: &mut Checker<'_>) -> CheckResult {
        let first = MessageTemplate::new().code(Code::GET).option_string(OptionKind::UriPath, "large");
        checker.match_frame(Sender::Client, &first, Some(Verdict::Inconclusive))?;

        let block = MessageTemplate::new().code(Code::CONTENT).option_present(OptionKind::Block2);
        let next = MessageTemplate::new().code(Code::GET).option_present(OptionKind::Block2);
        checker.advance()?;
        checker.match_frame(Sender::Server, &block, Some(Verdict::Fail))?;

        while checker.message().and_then(CoapMessage::block2).is_some_and(|block| block.more) {
            checker.advance()?;
            checker.match_frame(Sender::Client, &next, Some(Verdict::Fail))?;
            checker.advance()?;
            checker.match_frame(Sender::Server, &block, Some(Verdict::Fail))?;
        }
        Ok(())
    }
}

/// Block-wise PUT of `/large-update`.
pub struct Block1Test;

impl TestCase for Block1Test {
    fn id(&self) -> &str {
        "TD_COAP_BLOCK_02"
    }

    fn objective(&self) -> &str {
        "Handle PUT blockwise transfer for large resource"
    }

    fn run(&self, checker: &mut Checker<'_>) -> CheckResult {
        let upload = MessageTemplate::new().code(Code::PUT).option_present(OptionKind::Block1);
        let first = upload.clone().option_string(OptionKind::UriPath, "large-update");
        checker.match_frame(Sender::Client, &first, Some(Verdict::Inconclusive))?;

        let proceed = MessageTemplate::new().mtype(MessageType::Acknowledgement).code(Code::CONTINUE);
        while checker.message().and_then(CoapMessage::block1).is_some_and(|block| block.more) {
            checker.advance()?;
            checker.match_frame(Sender::Server, &proceed, Some(Verdict::Fail))?;
            checker.advance()?;
            checker.match_frame(Sender::Client, &upload, Some(Verdict::Fail))?;
        }

        checker.advance()?;
        let changed = MessageTemplate::new().code(Code::CHANGED);
        checker.match_frame(Sender::Server, &changed, Some(Verdict::Fail))?;
        Ok(())
    }
}

/// Every plugtest-style test case above.
pub fn plugtest_registry() -> TestCaseRegistry {
    let mut registry = TestCaseRegistry::new();
    registry.register(GetTest).unwrap();
    registry.register(ObserveTest).unwrap();
    registry.register(Block2Test).unwrap();
    registry.register(Block1Test).unwrap();
    registry
}
