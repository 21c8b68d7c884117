use std::borrow::Cow;
use std::io::{self, BufRead};

/// Maps one record (a line of text) to the key it is counted under.
///
/// Implementations must be pure: the same record always yields the same key.
/// Empty keys are legal and are counted like any other key.
pub trait KeyExtractor {
    fn extract_key<'r>(&self, record: &'r str) -> Cow<'r, str>;
}

impl<F> KeyExtractor for F
where
    F: Fn(&str) -> String,
{
    fn extract_key<'r>(&self, record: &'r str) -> Cow<'r, str> {
        Cow::Owned(self(record))
    }
}

/// Client address of a Common/Combined Log Format line: the first
/// space-separated token, trimmed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIp;

impl KeyExtractor for ClientIp {
    fn extract_key<'r>(&self, record: &'r str) -> Cow<'r, str> {
        let token = match record.split_once(' ') {
            Some((head, _)) => head,
            None => record,
        };
        Cow::Borrowed(token.trim())
    }
}

/// The n-th (zero-based) whitespace-separated field, or an empty key when the
/// record has fewer fields.
#[derive(Debug, Clone, Copy)]
pub struct WhitespaceField(pub usize);

impl KeyExtractor for WhitespaceField {
    fn extract_key<'r>(&self, record: &'r str) -> Cow<'r, str> {
        Cow::Borrowed(record.split_whitespace().nth(self.0).unwrap_or(""))
    }
}

/// Line iterator that never rejects a line for bad encoding: invalid UTF-8 is
/// replaced with U+FFFD so the record is still counted.
pub struct LossyLines<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.clear();
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) => None,
            Ok(_) => {
                if self.buffer.last() == Some(&b'\n') {
                    self.buffer.pop();
                    if self.buffer.last() == Some(&b'\r') {
                        self.buffer.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buffer).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
