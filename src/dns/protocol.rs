//! Transport-agnostic representation of the slice of RFC 1035 this forwarder needs:
//! header, question section, and A-record resource records. Every other record type
//! is kept as an opaque blob of already-read-and-reserialized fields so that a reply
//! containing e.g. an NS or TXT record can still be forwarded byte-identical to the
//! client even though this crate never interprets it.

use std::net::Ipv4Addr;

use derive_more::{Display, Error, From};

use crate::dns::buffer::{BufferError, PacketBuffer};

#[derive(Debug, Display, From, Error)]
pub enum ProtocolError {
    Buffer(BufferError),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    NoError = 0,
    FormErr = 1,
    ServFail = 2,
    NxDomain = 3,
    NotImp = 4,
    Refused = 5,
}

impl ResultCode {
    fn from_num(num: u8) -> ResultCode {
        match num {
            1 => ResultCode::FormErr,
            2 => ResultCode::ServFail,
            3 => ResultCode::NxDomain,
            4 => ResultCode::NotImp,
            5 => ResultCode::Refused,
            _ => ResultCode::NoError,
        }
    }

    fn to_num(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    A,
    Other(u16),
}

impl QueryType {
    pub fn to_num(self) -> u16 {
        match self {
            QueryType::A => 1,
            QueryType::Other(x) => x,
        }
    }

    pub fn from_num(num: u16) -> QueryType {
        match num {
            1 => QueryType::A,
            x => QueryType::Other(x),
        }
    }
}

/// DNS message header (RFC 1035 §4.1.1).
#[derive(Debug, Clone)]
pub struct Header {
    pub id: u16,

    pub response: bool,
    pub opcode: u8,
    pub authoritative_answer: bool,
    pub truncated: bool,
    pub recursion_desired: bool,

    pub recursion_available: bool,
    pub z: bool,
    pub rescode: ResultCode,

    pub questions: u16,
    pub answers: u16,
    pub authoritative_entries: u16,
    pub resource_entries: u16,
}

impl Header {
    pub fn new() -> Header {
        Header {
            id: 0,
            response: false,
            opcode: 0,
            authoritative_answer: false,
            truncated: false,
            recursion_desired: false,
            recursion_available: false,
            z: false,
            rescode: ResultCode::NoError,
            questions: 0,
            answers: 0,
            authoritative_entries: 0,
            resource_entries: 0,
        }
    }

    pub fn read(buffer: &mut PacketBuffer) -> Result<Header> {
        let id = buffer.read_u16()?;

        let flags = buffer.read_u16()?;
        let a = (flags >> 8) as u8;
        let b = (flags & 0xFF) as u8;

        Ok(Header {
            id,
            recursion_desired: (a & 1) > 0,
            truncated: (a & 2) > 0,
            authoritative_answer: (a & 4) > 0,
            opcode: (a >> 3) & 0x0F,
            response: (a & 0x80) > 0,

            rescode: ResultCode::from_num(b & 0x0F),
            z: (b & 0x40) > 0,
            recursion_available: (b & 0x80) > 0,

            questions: buffer.read_u16()?,
            answers: buffer.read_u16()?,
            authoritative_entries: buffer.read_u16()?,
            resource_entries: buffer.read_u16()?,
        })
    }

    pub fn write(&self, buffer: &mut PacketBuffer) {
        buffer.write_u16(self.id);

        let a = (self.recursion_desired as u8)
            | ((self.truncated as u8) << 1)
            | ((self.authoritative_answer as u8) << 2)
            | (self.opcode << 3)
            | ((self.response as u8) << 7);
        let b = self.rescode.to_num()
            | ((self.z as u8) << 6)
            | ((self.recursion_available as u8) << 7);
        buffer.write_u8(a);
        buffer.write_u8(b);

        buffer.write_u16(self.questions);
        buffer.write_u16(self.answers);
        buffer.write_u16(self.authoritative_entries);
        buffer.write_u16(self.resource_entries);
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct Question {
    pub name: String,
    pub qtype: QueryType,
}

impl Question {
    pub fn new(name: String, qtype: QueryType) -> Question {
        Question { name, qtype }
    }

    pub fn read(buffer: &mut PacketBuffer) -> Result<Question> {
        let name = buffer.read_qname()?;
        let qtype = QueryType::from_num(buffer.read_u16()?);
        let _class = buffer.read_u16()?; // always IN, not interpreted

        Ok(Question { name, qtype })
    }

    pub fn write(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_qname(&self.name)?;
        buffer.write_u16(self.qtype.to_num());
        buffer.write_u16(1); // QCLASS IN
        Ok(())
    }
}

/// A resource record. `A` is the only variant this crate interprets; everything else
/// is preserved exactly as read so a forwarded reply can carry it through unexamined.
#[derive(Debug, Clone)]
pub enum Record {
    A {
        domain: String,
        addr: Ipv4Addr,
        ttl: u32,
    },
    Other {
        domain: String,
        qtype: u16,
        ttl: u32,
        data: Vec<u8>,
    },
}

impl Record {
    pub fn read(buffer: &mut PacketBuffer) -> Result<Record> {
        let domain = buffer.read_qname()?;

        let qtype_num = buffer.read_u16()?;
        let _class = buffer.read_u16()?;
        let ttl = buffer.read_u32()?;
        let data_len = buffer.read_u16()?;

        if qtype_num == QueryType::A.to_num() && data_len == 4 {
            let raw = buffer.read_u32()?;
            let addr = Ipv4Addr::new(
                ((raw >> 24) & 0xFF) as u8,
                ((raw >> 16) & 0xFF) as u8,
                ((raw >> 8) & 0xFF) as u8,
                (raw & 0xFF) as u8,
            );
            Ok(Record::A { domain, addr, ttl })
        } else {
            let data = buffer.read_bytes(data_len as usize)?;
            Ok(Record::Other {
                domain,
                qtype: qtype_num,
                ttl,
                data,
            })
        }
    }

    pub fn write(&self, buffer: &mut PacketBuffer) -> Result<()> {
        match self {
            Record::A { domain, addr, ttl } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::A.to_num());
                buffer.write_u16(1); // IN
                buffer.write_u32(*ttl);
                buffer.write_u16(4);
                let octets = addr.octets();
                buffer.write_bytes(&octets);
            }
            Record::Other {
                domain,
                qtype,
                ttl,
                data,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(*qtype);
                buffer.write_u16(1);
                buffer.write_u32(*ttl);
                buffer.write_u16(data.len() as u16);
                buffer.write_bytes(data);
            }
        }
        Ok(())
    }

    pub fn domain(&self) -> &str {
        match self {
            Record::A { domain, .. } => domain,
            Record::Other { domain, .. } => domain,
        }
    }
}

/// A full DNS message: header, questions, and answer records. Authority/additional
/// sections are intentionally not modeled — this crate neither synthesizes them nor
/// needs to inspect them (non-A forwarded replies are passed through as raw bytes,
/// never round-tripped through this struct).
#[derive(Debug, Clone)]
pub struct Packet {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
}

impl Packet {
    pub fn new() -> Packet {
        Packet {
            header: Header::new(),
            questions: Vec::new(),
            answers: Vec::new(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Packet> {
        let mut buffer = PacketBuffer::from_bytes(bytes);
        let header = Header::read(&mut buffer)?;

        let mut questions = Vec::with_capacity(header.questions as usize);
        for _ in 0..header.questions {
            questions.push(Question::read(&mut buffer)?);
        }

        let mut answers = Vec::with_capacity(header.answers as usize);
        for _ in 0..header.answers {
            answers.push(Record::read(&mut buffer)?);
        }

        // Authority/additional sections are not modeled; forwarded replies carry
        // them through as raw bytes rather than being round-tripped through Packet.
        Ok(Packet {
            header,
            questions,
            answers,
        })
    }

    pub fn write(&self) -> Result<Vec<u8>> {
        let mut buffer = PacketBuffer::new();
        let mut header = self.header.clone();
        header.questions = self.questions.len() as u16;
        header.answers = self.answers.len() as u16;
        header.write(&mut buffer);

        for question in &self.questions {
            question.write(&mut buffer)?;
        }
        for answer in &self.answers {
            answer.write(&mut buffer)?;
        }

        Ok(buffer.buf)
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::new()
    }
}
