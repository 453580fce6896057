//! Messages exchanged with the companion app
//!
//! A message is a small dictionary of integer keys to typed values. On the wire it is
//! laid out little-endian as
//!
//! ```text
//! count: u8
//! count x { key: u32, type: u8, length: u16, value: [u8; length] }
//! ```
//!
//! where `type` is 0 for a byte array, 1 for a NUL terminated UTF-8 string, 2 for an
//! unsigned and 3 for a signed integer of 1, 2 or 4 bytes.

use core::fmt;

use heapless::{String, Vec};

use crate::ui::write_truncated;

/// Temperature in degrees Fahrenheit, integer
pub const KEY_TEMPERATURE: u32 = 0;
/// Short description of the current conditions, string
pub const KEY_CONDITIONS: u32 = 1;
/// Key of the weather request sent to the phone
pub const KEY_REQUEST: u32 = 0;

/// Maximum number of tuples in one message
pub const MAX_TUPLES: usize = 8;
/// Maximum length of a string or byte array value, terminator excluded. Longer strings
/// are cut, longer byte arrays rejected.
pub const MAX_VALUE_LEN: usize = 64;
/// Upper bound of an encoded message
pub const MAX_MESSAGE_LEN: usize = 1 + MAX_TUPLES * (TUPLE_HEADER_LEN + MAX_VALUE_LEN + 1);

const TUPLE_HEADER_LEN: usize = 7;

const TYPE_BYTE_ARRAY: u8 = 0;
const TYPE_CSTRING: u8 = 1;
const TYPE_UINT: u8 = 2;
const TYPE_INT: u8 = 3;

/// Value of a single dictionary entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TupleValue {
    ByteArray(Vec<u8, MAX_VALUE_LEN>),
    CString(String<MAX_VALUE_LEN>),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Int8(i8),
    Int16(i16),
    Int32(i32),
}

impl TupleValue {
    /// Integer value widened to `i32`, `None` for non-integers and for `u32` values
    /// that do not fit.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            TupleValue::Uint8(v) => Some(v.into()),
            TupleValue::Uint16(v) => Some(v.into()),
            TupleValue::Uint32(v) => i32::try_from(v).ok(),
            TupleValue::Int8(v) => Some(v.into()),
            TupleValue::Int16(v) => Some(v.into()),
            TupleValue::Int32(v) => Some(v),
            TupleValue::ByteArray(_) | TupleValue::CString(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TupleValue::CString(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn type_tag(&self) -> u8 {
        match self {
            TupleValue::ByteArray(_) => TYPE_BYTE_ARRAY,
            TupleValue::CString(_) => TYPE_CSTRING,
            TupleValue::Uint8(_) | TupleValue::Uint16(_) | TupleValue::Uint32(_) => TYPE_UINT,
            TupleValue::Int8(_) | TupleValue::Int16(_) | TupleValue::Int32(_) => TYPE_INT,
        }
    }

    /// Length of the encoded value, including the terminator of strings.
    fn encoded_len(&self) -> usize {
        match self {
            TupleValue::ByteArray(v) => v.len(),
            TupleValue::CString(s) => s.len() + 1,
            TupleValue::Uint8(_) | TupleValue::Int8(_) => 1,
            TupleValue::Uint16(_) | TupleValue::Int16(_) => 2,
            TupleValue::Uint32(_) | TupleValue::Int32(_) => 4,
        }
    }
}

/// One key/value entry of a [`Dictionary`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tuple {
    pub key: u32,
    pub value: TupleValue,
}

/// A message to or from the companion app.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dictionary {
    tuples: Vec<Tuple, MAX_TUPLES>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self { tuples: Vec::new() }
    }

    /// The message asking the phone to fetch the weather now.
    pub fn weather_request() -> Self {
        let mut dict = Self::new();
        // An empty dictionary has room for one tuple
        let _ = dict.insert(KEY_REQUEST, TupleValue::Uint8(0));
        dict
    }

    /// Insert a value, replacing an existing one with the same key.
    pub fn insert(&mut self, key: u32, value: TupleValue) -> Result<(), MessageError> {
        if let TupleValue::CString(s) = &value {
            if s.as_bytes().contains(&0) {
                return Err(MessageError::InvalidValue);
            }
        }
        if let Some(tuple) = self.tuples.iter_mut().find(|t| t.key == key) {
            tuple.value = value;
            return Ok(());
        }
        self.tuples
            .push(Tuple { key, value })
            .map_err(|_| MessageError::TooManyTuples)
    }

    /// Look up the tuple with the given key.
    pub fn find(&self, key: u32) -> Option<&Tuple> {
        self.tuples.iter().find(|t| t.key == key)
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Number of bytes [`Dictionary::write_to`] needs.
    pub fn encoded_len(&self) -> usize {
        1 + self
            .tuples
            .iter()
            .map(|t| TUPLE_HEADER_LEN + t.value.encoded_len())
            .sum::<usize>()
    }

    /// Decode a message received from the phone.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MessageError> {
        let (&count, mut rest) = bytes.split_first().ok_or(MessageError::Truncated)?;
        if count as usize > MAX_TUPLES {
            return Err(MessageError::TooManyTuples);
        }

        let mut dict = Self::new();
        for _ in 0..count {
            if rest.len() < TUPLE_HEADER_LEN {
                return Err(MessageError::Truncated);
            }
            let (header, body) = rest.split_at(TUPLE_HEADER_LEN);
            let key = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let tag = header[4];
            let len = u16::from_le_bytes([header[5], header[6]]) as usize;
            if body.len() < len {
                return Err(MessageError::Truncated);
            }
            let (data, tail) = body.split_at(len);
            dict.insert(key, decode_value(tag, data)?)?;
            rest = tail;
        }

        if !rest.is_empty() {
            return Err(MessageError::TrailingBytes);
        }
        Ok(dict)
    }

    /// Encode the message into `buf`, returning the number of bytes written.
    pub fn write_to(&self, buf: &mut [u8]) -> Result<usize, MessageError> {
        let len = self.encoded_len();
        if buf.len() < len {
            return Err(MessageError::BufferTooSmall);
        }

        buf[0] = self.tuples.len() as u8;
        let mut pos = 1;
        for tuple in &self.tuples {
            let value_len = tuple.value.encoded_len();
            buf[pos..pos + 4].copy_from_slice(&tuple.key.to_le_bytes());
            buf[pos + 4] = tuple.value.type_tag();
            buf[pos + 5..pos + 7].copy_from_slice(&(value_len as u16).to_le_bytes());
            pos += TUPLE_HEADER_LEN;

            let out = &mut buf[pos..pos + value_len];
            match &tuple.value {
                TupleValue::ByteArray(v) => out.copy_from_slice(v),
                TupleValue::CString(s) => {
                    out[..s.len()].copy_from_slice(s.as_bytes());
                    out[s.len()] = 0;
                }
                TupleValue::Uint8(v) => out.copy_from_slice(&v.to_le_bytes()),
                TupleValue::Uint16(v) => out.copy_from_slice(&v.to_le_bytes()),
                TupleValue::Uint32(v) => out.copy_from_slice(&v.to_le_bytes()),
                TupleValue::Int8(v) => out.copy_from_slice(&v.to_le_bytes()),
                TupleValue::Int16(v) => out.copy_from_slice(&v.to_le_bytes()),
                TupleValue::Int32(v) => out.copy_from_slice(&v.to_le_bytes()),
            }
            pos += value_len;
        }

        Ok(pos)
    }
}

fn decode_value(tag: u8, data: &[u8]) -> Result<TupleValue, MessageError> {
    match (tag, data.len()) {
        (TYPE_BYTE_ARRAY, _) => Vec::from_slice(data)
            .map(TupleValue::ByteArray)
            .map_err(|_| MessageError::ValueTooLong),
        (TYPE_CSTRING, _) => {
            // Everything after the first terminator is padding
            let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
            let text = core::str::from_utf8(&data[..end]).map_err(|_| MessageError::InvalidUtf8)?;
            // Long strings are cut between chars, the display only shows a prefix
            let mut s = String::new();
            write_truncated(&mut s, format_args!("{}", text));
            Ok(TupleValue::CString(s))
        }
        (TYPE_UINT, 1) => Ok(TupleValue::Uint8(data[0])),
        (TYPE_UINT, 2) => Ok(TupleValue::Uint16(u16::from_le_bytes([data[0], data[1]]))),
        (TYPE_UINT, 4) => Ok(TupleValue::Uint32(u32::from_le_bytes([
            data[0], data[1], data[2], data[3],
        ]))),
        (TYPE_INT, 1) => Ok(TupleValue::Int8(data[0] as i8)),
        (TYPE_INT, 2) => Ok(TupleValue::Int16(i16::from_le_bytes([data[0], data[1]]))),
        (TYPE_INT, 4) => Ok(TupleValue::Int32(i32::from_le_bytes([
            data[0], data[1], data[2], data[3],
        ]))),
        (TYPE_UINT | TYPE_INT, _) => Err(MessageError::InvalidIntegerWidth),
        _ => Err(MessageError::UnknownType(tag)),
    }
}

/// Malformed or oversized message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageError {
    /// Message ends in the middle of a tuple
    Truncated,
    /// Bytes left over after the last tuple
    TrailingBytes,
    /// More tuples than a message can hold
    TooManyTuples,
    /// String or byte array longer than a message can hold
    ValueTooLong,
    /// Integer tuple with a length other than 1, 2 or 4
    InvalidIntegerWidth,
    /// Unknown tuple type
    UnknownType(u8),
    /// String is not UTF-8
    InvalidUtf8,
    /// String contains a NUL byte
    InvalidValue,
    /// Output buffer cannot hold the encoded message
    BufferTooSmall,
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::Truncated => f.write_str("message truncated"),
            MessageError::TrailingBytes => f.write_str("trailing bytes after last tuple"),
            MessageError::TooManyTuples => f.write_str("too many tuples"),
            MessageError::ValueTooLong => f.write_str("value too long"),
            MessageError::InvalidIntegerWidth => f.write_str("invalid integer width"),
            MessageError::UnknownType(tag) => write!(f, "unknown tuple type {}", tag),
            MessageError::InvalidUtf8 => f.write_str("string is not UTF-8"),
            MessageError::InvalidValue => f.write_str("string contains NUL"),
            MessageError::BufferTooSmall => f.write_str("buffer too small"),
        }
    }
}

/// Outcome reasons of the message channel, named after the result codes companion
/// apps already know.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppMessageResult {
    /// The phone did not acknowledge in time
    SendTimeout,
    /// The phone rejected the message
    SendRejected,
    /// No phone connected
    NotConnected,
    /// The companion app is not running
    AppNotRunning,
    /// The message could not be parsed
    InvalidArgs,
    /// A previous message is still in flight
    Busy,
    /// The message does not fit the buffer
    BufferOverflow,
    /// The channel is closed
    Closed,
    /// Anything else went wrong
    InternalError,
}

impl From<MessageError> for AppMessageResult {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::TooManyTuples
            | MessageError::ValueTooLong
            | MessageError::BufferTooSmall => AppMessageResult::BufferOverflow,
            _ => AppMessageResult::InvalidArgs,
        }
    }
}

impl fmt::Display for AppMessageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AppMessageResult::SendTimeout => "send timeout",
            AppMessageResult::SendRejected => "send rejected",
            AppMessageResult::NotConnected => "not connected",
            AppMessageResult::AppNotRunning => "app not running",
            AppMessageResult::InvalidArgs => "invalid arguments",
            AppMessageResult::Busy => "busy",
            AppMessageResult::BufferOverflow => "buffer overflow",
            AppMessageResult::Closed => "closed",
            AppMessageResult::InternalError => "internal error",
        })
    }
}
