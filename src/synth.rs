//! Builds a wire-format DNS A-record reply from a parsed query and an IP string, for
//! cache and blocklist hits.
//!
//! Assembled from ordinary owned `Header`/`Question`/`Record` values into one `Packet`
//! and propagated with `?` — there is nothing to free on an error path because nothing
//! is allocated outside the `Packet` that doesn't make it in.

use std::net::Ipv4Addr;
use std::str::FromStr;

use derive_more::{Display, Error, From};

use crate::dns::protocol::{Header, Packet, Question, QueryType, Record, ResultCode};

/// ≈10 years: makes cached/blocked answers sticky at the client, so a local resolver
/// doesn't needlessly re-query a forwarder that already knows the answer.
pub const STICKY_TTL: u32 = 315_576_000;

#[derive(Debug, Display, From, Error)]
pub enum SynthError {
    #[display(fmt = "query has no question section")]
    NoQuestion,
    #[display(fmt = "invalid ipv4 address: {}", _0)]
    InvalidIp(String),
    Protocol(crate::dns::protocol::ProtocolError),
}

pub type Result<T> = std::result::Result<T, SynthError>;

pub struct Synthesizer;

impl Synthesizer {
    /// Builds a reply packet for `query` answering with `ip`. Copies the transaction
    /// ID and RD flag from `query`; sets QR, AA, RA, RCODE=NOERROR; exactly one
    /// question (the original qname, A/IN) and one answer (A/IN, TTL `STICKY_TTL`,
    /// the given IP).
    pub fn synthesize(query: &Packet, ip: &str) -> Result<Packet> {
        let question = query.questions.first().ok_or(SynthError::NoQuestion)?;
        let addr = Ipv4Addr::from_str(ip).map_err(|_| SynthError::InvalidIp(ip.to_string()))?;

        let mut header = Header::new();
        header.id = query.header.id;
        header.response = true;
        header.authoritative_answer = true;
        header.recursion_desired = query.header.recursion_desired;
        header.recursion_available = true;
        header.rescode = ResultCode::NoError;

        let reply_question = Question::new(question.name.clone(), QueryType::A);
        let answer = Record::A {
            domain: question.name.clone(),
            addr,
            ttl: STICKY_TTL,
        };

        Ok(Packet {
            header,
            questions: vec![reply_question],
            answers: vec![answer],
        })
    }

    /// Serializes `packet` to wire bytes for `sendto`.
    pub fn serialize(packet: &Packet) -> Result<Vec<u8>> {
        Ok(packet.write()?)
    }
}
