//! Verdict engine behaviour over tracked captures

mod common;

use coapscope::check::{CheckResult, Checker, MessageTemplate, Sender, TestCase, TestCaseRegistry};
use coapscope::codec::{CoapMessage, CoapOption, Code, MessageType, OptionKind};
use coapscope::{Analysis, AnalysisConfig, AnalysisError, ConversationId, Frame, Verdict, run_check, track};
use common::*;

fn non_confirmable_get() -> Vec<Frame> {
    CaptureBuilder::new()
        .request(CoapMessage::new(MessageType::NonConfirmable, Code::GET, 800).with_token([0x61]).with_uri_path("test"))
        .reply(CoapMessage::new(MessageType::NonConfirmable, Code::CONTENT, 900).with_token([0x61]))
        .build()
}

#[test]
fn forced_run_proceeds_past_first_inconclusive() {
    init_logging();
    let mut registry = TestCaseRegistry::new();
    registry.register(GetTest).unwrap();
    let report = Analysis::new(&registry, AnalysisConfig::default()).analyse(non_confirmable_get()).unwrap();

    assert_eq!(report.buckets.len(), 1);
    let occurrence = &report.buckets[0].occurrences[0];
    assert!(occurrence.applicable);
    assert_eq!(occurrence.implicated.iter().map(|f| f.0).collect::<Vec<_>>(), vec![1]);
    assert!(occurrence.log.contains("#2 matches"), "{}", occurrence.log);
    assert_eq!(occurrence.verdict, Verdict::Pass);
}

#[test]
fn non_forced_run_skips_the_same_conversation() {
    init_logging();
    let mut registry = TestCaseRegistry::new();
    registry.register(GetTest).unwrap();
    registry.register(Block1Test).unwrap();
    let report = Analysis::new(&registry, AnalysisConfig::default()).analyse(non_confirmable_get()).unwrap();

    assert!(report.buckets.is_empty());
    assert_eq!(report.verdict(), Verdict::None);
    assert_eq!(report.test_case_summary("TD_COAP_CORE_01").ignored.len(), 2);
}

#[test]
fn config_selection_forces_the_remaining_test_case() {
    init_logging();
    let registry = plugtest_registry();
    let config = AnalysisConfig::from_yaml_str("test_cases: [TD_COAP_CORE_01]\n").unwrap();
    let report = Analysis::new(&registry, config).analyse(non_confirmable_get()).unwrap();
    assert_eq!(report.buckets.len(), 1);
    assert_eq!(report.buckets[0].test_case, "TD_COAP_CORE_01");
}

/// Cache revalidation spanning two exchanges: the second GET carries the ETag of the first
/// response and is answered with 2.03 Valid.
struct Revalidation;

impl TestCase for Revalidation {
    fn id(&self) -> &str {
        "TD_COAP_CORE_ETAG"
    }

    fn objective(&self) -> &str {
        "Revalidate a cached representation with its ETag"
    }

    fn run(&self, checker: &mut Checker<'_>) -> CheckResult {
        let get = MessageTemplate::new().code(Code::GET).option_string(OptionKind::UriPath, "validate");
        checker.match_frame(Sender::Client, &get, Some(Verdict::Inconclusive))?;
        checker.advance()?;

        let tagged = MessageTemplate::new().code(Code::CONTENT).option_present(OptionKind::ETag);
        if !checker.match_frame(Sender::Server, &tagged, Some(Verdict::Fail))? {
            return Err(checker.halt("first response carries no ETag"));
        }
        let etag = checker
            .message()
            .and_then(|message| message.option(OptionKind::ETag))
            .map(|option| option.value.clone())
            .unwrap_or_default();

        checker.chain()?;
        let conditional = get.option_value(OptionKind::ETag, etag);
        checker.match_frame(Sender::Client, &conditional, Some(Verdict::Fail))?;
        checker.advance()?;
        checker.match_frame(Sender::Server, &MessageTemplate::new().code(Code::VALID), Some(Verdict::Fail))?;
        Ok(())
    }
}

#[test]
fn chain_into_linked_conversation() {
    init_logging();
    let etag = || CoapOption::with_kind(OptionKind::ETag, vec![0x5A, 0x01]);
    let second_port: std::net::SocketAddr = "10.0.0.1:40001".parse().unwrap();
    let frames = CaptureBuilder::new()
        .request(con(Code::GET, 10, 0x01, "validate"))
        .reply(ack(Code::CONTENT, 10, 0x01).with_option(etag()))
        .wait(5.0)
        .send(second_port, server(), con(Code::GET, 11, 0x02, "validate").with_option(etag()))
        .send(server(), second_port, ack(Code::VALID, 11, 0x02))
        .build();

    let capture = track(frames, &AnalysisConfig::default());
    assert_eq!(capture.conversations[0].next, Some(ConversationId(1)));

    let report = run_check(&capture.conversations, ConversationId(0), &Revalidation, true).unwrap();
    assert_eq!(report.verdict, Verdict::Pass, "{}", report.log);
    assert!(report.log.contains("chaining into conversation 1"));

    let unlinked = track(
        capture.conversations[0].frames.clone(),
        &AnalysisConfig { link_conversations: false, ..AnalysisConfig::default() },
    );
    let report = run_check(&unlinked.conversations, ConversationId(0), &Revalidation, true).unwrap();
    assert_eq!(report.verdict, Verdict::Pass);
    assert!(report.log.contains("no following conversation"));
}

/// Fails through `?` on a library error in the middle of the script.
struct BrokenScript;

impl TestCase for BrokenScript {
    fn id(&self) -> &str {
        "BROKEN"
    }

    fn objective(&self) -> &str {
        "Script that trips over its own template"
    }

    fn run(&self, checker: &mut Checker<'_>) -> CheckResult {
        checker.match_frame(Sender::Any, &MessageTemplate::new(), Some(Verdict::Fail))?;
        let message = checker.message().cloned().unwrap_or_else(|| CoapMessage::new(MessageType::Reset, Code::EMPTY, 0));
        let oversized = message.with_option(CoapOption::new(40, Vec::<u8>::new()).with_delta(20));
        oversized.encode()?;
        Ok(())
    }
}

#[test]
fn script_errors_force_error_verdict() {
    init_logging();
    let mut registry = TestCaseRegistry::new();
    registry.register(BrokenScript).unwrap();
    let frames = CaptureBuilder::new()
        .request(con(Code::GET, 1, 0x01, "test"))
        .reply(ack(Code::CONTENT, 1, 0x01))
        .build();

    let report = Analysis::new(&registry, AnalysisConfig::default()).analyse(frames).unwrap();
    assert_eq!(report.verdict(), Verdict::Error);
    assert!(report.buckets[0].occurrences[0].log.contains("Encode error"));
}

#[test]
fn raw_datagrams_and_message_id_expiry() {
    init_logging();
    let config = AnalysisConfig::from_yaml_str(
        "transmission:\n  ack_timeout: 1.0\n  ack_random_factor: 1.0\n  max_retransmit: 0\n",
    )
    .unwrap();
    assert_eq!(config.max_timeout(), 3.0);

    let request = con(Code::GET, 0x10, 0x07, "test").encode().unwrap();
    let empty_ack = empty(MessageType::Acknowledgement, 0x10).encode().unwrap();
    let separate = CoapMessage::new(MessageType::Confirmable, Code::CONTENT, 0x20).with_token([0x07]);
    let late_ack = empty(MessageType::Acknowledgement, 0x20);

    let frames = CaptureBuilder::new()
        .datagram(&request)
        .send(server(), client(), CoapMessage::decode(&empty_ack).unwrap())
        .wait(1.0)
        .reply(separate)
        .wait(4.0)
        .request(late_ack)
        .build();

    let capture = track(frames, &config);
    assert_eq!(capture.conversations.len(), 1);
    assert_eq!(capture.conversations[0].frame_ids().map(|f| f.0).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(capture.ignored.len(), 1);
    assert_eq!(capture.ignored[0].id.0, 4);
}

#[test]
fn observation_cancelled_by_reset_starts_fresh() {
    init_logging();
    let frames = CaptureBuilder::new()
        .request(observe(con(Code::GET, 1, 0x0A, "obs"), 0))
        .reply(observe(ack(Code::CONTENT, 1, 0x0A), 5))
        .reply(observe(CoapMessage::new(MessageType::Confirmable, Code::CONTENT, 50).with_token([0x0A]), 6))
        .request(empty(MessageType::Reset, 50))
        .request(observe(con(Code::GET, 2, 0x0B, "obs"), 0))
        .reply(observe(ack(Code::CONTENT, 2, 0x0B), 7))
        .build();

    let capture = track(frames, &AnalysisConfig::default());
    assert_eq!(capture.conversations.len(), 2);
    assert_eq!(capture.conversations[0].len(), 4);
    assert!(!capture.conversations[0].observe_active);
    assert!(capture.conversations[1].observe_active);
}

#[test]
fn undecodable_option_chain_reports_offset() {
    // count 1, option header claims 4 value bytes, only 1 present
    let error = CoapMessage::decode(&[0x41, 0x01, 0x00, 0x01, 0x14, 0xAA]).unwrap_err();
    match error {
        AnalysisError::Decode { offset, .. } => assert_eq!(offset, 4),
        other => panic!("Expected Decode error, got {:?}", other),
    }
}
