//! Test utilities for building frames, messages and synthetic captures
//!
//! Shared by the unit tests and the benchmarks. Frames built with [`frame_to`] travel
//! from [`CLIENT`] to [`SERVER`], frames built with [`frame_from`] the other way.

#![cfg(any(test, feature = "benchmark"))]

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::codec::{CoapMessage, CoapOption, Code, MessageType, OptionKind, OptionList};
use crate::types::Frame;

/// Default client endpoint.
pub const CLIENT: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 40000));

/// Default server endpoint.
pub const SERVER: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 2), 5683));

/// Parse a socket address literal.
pub fn at(address: &str) -> SocketAddr {
    address.parse().unwrap_or_else(|e| panic!("invalid test address {}: {}", address, e))
}

/// Frame sent by [`CLIENT`] to [`SERVER`].
pub fn frame_to(id: u64, timestamp: f64, message: CoapMessage) -> Frame {
    Frame::new(id, timestamp, CLIENT, SERVER, message)
}

/// Frame sent by [`SERVER`] to [`CLIENT`].
pub fn frame_from(id: u64, timestamp: f64, message: CoapMessage) -> Frame {
    Frame::new(id, timestamp, SERVER, CLIENT, message)
}

/// Confirmable GET with a one-byte token.
pub fn get_request(message_id: u16, token: u8, path: &str) -> CoapMessage {
    CoapMessage::new(MessageType::Confirmable, Code::GET, message_id)
        .with_token([token])
        .with_uri_path(path)
}

/// 2.05 Content piggybacked on the acknowledgement of `message_id`.
pub fn piggybacked(message_id: u16, token: u8) -> CoapMessage {
    CoapMessage::new(MessageType::Acknowledgement, Code::CONTENT, message_id).with_token([token])
}

pub fn empty_ack(message_id: u16) -> CoapMessage {
    CoapMessage::new(MessageType::Acknowledgement, Code::EMPTY, message_id)
}

/// `count` distinct options, spread so that some gaps need fenceposts.
pub fn spread_options(count: usize) -> OptionList {
    const KINDS: [OptionKind; 6] = [
        OptionKind::ContentType,
        OptionKind::UriPath,
        OptionKind::Token,
        OptionKind::UriQuery,
        OptionKind::Block2,
        OptionKind::Unknown(49),
    ];
    (0..count)
        .map(|i| {
            let kind = KINDS[i % KINDS.len()];
            CoapOption::with_kind(kind, vec![i as u8; i % 5])
        })
        .collect()
}

/// `conversations` GET exchanges, each a request and a piggybacked response.
///
/// Exchanges alternate between a handful of client ports so several flows are active.
pub fn synthetic_capture(conversations: usize) -> Vec<Frame> {
    let mut frames = Vec::with_capacity(conversations * 2);
    for i in 0..conversations {
        let client = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 40000 + (i % 8) as u16));
        let message_id = i as u16;
        let token = (i as u32).to_be_bytes();
        let timestamp = i as f64 * 0.01;
        let request = CoapMessage::new(MessageType::Confirmable, Code::GET, message_id)
            .with_token(token)
            .with_uri_path("sensors/temperature");
        let response =
            CoapMessage::new(MessageType::Acknowledgement, Code::CONTENT, message_id).with_token(token);
        frames.push(Frame::new(2 * i as u64 + 1, timestamp, client, SERVER, request));
        frames.push(Frame::new(2 * i as u64 + 2, timestamp + 0.005, SERVER, client, response));
    }
    frames
}
