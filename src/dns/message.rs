use std::time::SystemTime;

use super::{DecodeError, HEADER_LEN, Header, Question, ResourceRecord, rcode};

/// A DNS message.
///
/// `answers` holds the answer, authority and additional records flattened
/// in the order they were received. The header counts say how they split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
}

impl Message {
    /// Parse the header and QDCOUNT questions of an inbound query.
    pub fn parse_query(data: &[u8]) -> Result<Self, DecodeError> {
        let header = Header::parse(data)?;
        let mut offset = HEADER_LEN;
        let questions = parse_questions(data, &mut offset, header.qdcount)?;

        Ok(Self {
            header,
            questions,
            answers: Vec::new(),
        })
    }

    /// Parse a full upstream response.
    ///
    /// Records are only decoded when RCODE is NoError; any other response
    /// keeps an empty answer list.
    pub fn parse_response(data: &[u8]) -> Result<Self, DecodeError> {
        let header = Header::parse(data)?;
        let mut offset = HEADER_LEN;
        let questions = parse_questions(data, &mut offset, header.qdcount)?;

        let mut answers = Vec::new();
        if header.rcode == rcode::NO_ERROR {
            answers.reserve(header.record_count().min(64));
            for _ in 0..header.record_count() {
                answers.push(ResourceRecord::parse(data, &mut offset)?);
            }
        }

        Ok(Self {
            header,
            questions,
            answers,
        })
    }

    /// Name of the first question, which keys the cache and drives policy.
    pub fn query_name(&self) -> Option<&str> {
        self.questions.first().map(|q| q.qname.as_str())
    }

    /// Whether the cached message has aged out at `now`.
    ///
    /// The first answer stands in for the whole message. A message without
    /// answers never expires; such messages are never cached.
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.answers
            .first()
            .and_then(ResourceRecord::expires_at)
            .is_some_and(|expires| now >= expires)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    /// Serialize header, questions and records.
    ///
    /// Header counts are rewritten to match the sequences. When the section
    /// split no longer adds up, every record is counted as an answer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut header = self.header;
        header.qdcount = self.questions.len() as u16;
        if header.record_count() != self.answers.len() {
            header.ancount = self.answers.len() as u16;
            header.nscount = 0;
            header.arcount = 0;
        }

        let mut buf = Vec::with_capacity(512);
        buf.extend_from_slice(&header.to_bytes());
        for question in &self.questions {
            question.write_to(&mut buf);
        }
        for answer in &self.answers {
            answer.write_to(&mut buf);
        }
        buf
    }

    /// Header and questions only, as sent to the upstream resolver.
    pub fn upstream_bytes(&self) -> Vec<u8> {
        let mut header = self.header;
        header.qdcount = self.questions.len() as u16;
        header.ancount = 0;
        header.nscount = 0;
        header.arcount = 0;

        let mut buf = Vec::with_capacity(512);
        buf.extend_from_slice(&header.to_bytes());
        for question in &self.questions {
            question.write_to(&mut buf);
        }
        buf
    }
}

fn parse_questions(
    data: &[u8],
    offset: &mut usize,
    count: u16,
) -> Result<Vec<Question>, DecodeError> {
    (0..count).map(|_| Question::parse(data, offset)).collect()
}
