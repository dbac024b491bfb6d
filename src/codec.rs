//! Length-prefixed response framing.
//!
//! A frame on the wire is a 2-byte big-endian unsigned body length followed
//! by that many body bytes:
//!
//! ```text
//! +--------+--------+--------+-----
//! | len hi | len lo |  body ...
//! +--------+--------+--------+-----
//! ```

use std::io::Read;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::warn;

use crate::error::{ExchangeError, Result};

/// Size of the length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Size of the response staging buffer; no frame may exceed it.
pub const MAX_FRAME_SIZE: usize = 1024;

/// Upper bound on `read` calls spent collecting one frame.
pub const MAX_READ_ITERATIONS: usize = 5;

/// Body length announced by the prefix, if at least two bytes are present.
pub fn frame_length(data: &[u8]) -> Option<usize> {
    match data {
        [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo]) as usize),
        _ => None,
    }
}

/// Prefix `body` with its length.
///
/// Fails if the body cannot be described by a 16-bit length.
pub fn encode_frame(body: &[u8]) -> Result<Bytes> {
    let len = u16::try_from(body.len()).map_err(|_| ExchangeError::FrameTooLarge {
        size: body.len() + LENGTH_PREFIX_SIZE,
        max: u16::MAX as usize + LENGTH_PREFIX_SIZE,
    })?;
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    buf.put_u16(len);
    buf.put_slice(body);
    Ok(buf.freeze())
}

/// Read one response frame into `buffer`, returning the number of bytes read.
///
/// Reads until the announced frame is complete, spending at most
/// [`MAX_READ_ITERATIONS`] reads. If the cap is hit first, whatever arrived is
/// returned. End of stream before a complete frame is
/// [`ExchangeError::ConnectionClosed`].
pub fn read_frame<R: Read>(reader: &mut R, buffer: &mut [u8; MAX_FRAME_SIZE]) -> Result<usize> {
    let mut position = 0;
    let mut msgsize = 0;
    let mut iteration = 0;

    while iteration < MAX_READ_ITERATIONS
        && (position < LENGTH_PREFIX_SIZE || position < msgsize + LENGTH_PREFIX_SIZE)
    {
        let n = reader.read(&mut buffer[position..])?;
        if n == 0 {
            return Err(ExchangeError::ConnectionClosed { received: position });
        }
        position += n;

        if let Some(len) = frame_length(&buffer[..position]) {
            msgsize = len;
            if msgsize + LENGTH_PREFIX_SIZE > MAX_FRAME_SIZE {
                return Err(ExchangeError::FrameTooLarge {
                    size: msgsize + LENGTH_PREFIX_SIZE,
                    max: MAX_FRAME_SIZE,
                });
            }
        }
        iteration += 1;
    }

    if position < msgsize + LENGTH_PREFIX_SIZE {
        warn!(
            position,
            expected = msgsize + LENGTH_PREFIX_SIZE,
            "Incomplete frame after {MAX_READ_ITERATIONS} reads"
        );
    }

    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    /// Hands out its chunks one `read` call at a time.
    struct Chunked(Vec<Vec<u8>>);

    impl Read for Chunked {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() {
                return Ok(0);
            }
            let chunk = self.0.remove(0);
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn test_frame_length() {
        assert_eq!(frame_length(&[]), None);
        assert_eq!(frame_length(&[0x00]), None);
        assert_eq!(frame_length(&[0x00, 0x05, b'H']), Some(5));
        assert_eq!(frame_length(&[0x01, 0x00]), Some(256));
        // High byte is unsigned.
        assert_eq!(frame_length(&[0x80, 0x00]), Some(0x8000));
    }

    #[test]
    fn test_encode_frame() {
        let frame = encode_frame(b"HELLO").unwrap();
        assert_eq!(frame.as_ref(), b"\x00\x05HELLO");

        let empty = encode_frame(&[]).unwrap();
        assert_eq!(empty.as_ref(), &[0x00, 0x00]);

        let huge = vec![0u8; 70_000];
        assert!(matches!(
            encode_frame(&huge),
            Err(ExchangeError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_read_frame_single_read() {
        let mut cursor = Cursor::new(b"\x00\x05HELLO".to_vec());
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let n = read_frame(&mut cursor, &mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"\x00\x05HELLO");
    }

    #[test]
    fn test_read_frame_split_reads() {
        let mut reader = Chunked(vec![vec![0x00], vec![0x05, b'H', b'E'], vec![b'L', b'L', b'O']]);
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let n = read_frame(&mut reader, &mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"\x00\x05HELLO");
    }

    #[test]
    fn test_read_frame_empty_body() {
        let mut cursor = Cursor::new(vec![0x00, 0x00, 0xEE]);
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let n = read_frame(&mut cursor, &mut buffer).unwrap();
        // Bytes past the frame that arrive in the same read are kept.
        assert_eq!(&buffer[..n], &[0x00, 0x00, 0xEE]);
    }

    #[test]
    fn test_read_frame_eof() {
        let mut cursor = Cursor::new(Vec::new());
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        assert!(matches!(
            read_frame(&mut cursor, &mut buffer),
            Err(ExchangeError::ConnectionClosed { received: 0 })
        ));

        let mut reader = Chunked(vec![vec![0x00, 0x05, b'H']]);
        assert!(matches!(
            read_frame(&mut reader, &mut buffer),
            Err(ExchangeError::ConnectionClosed { received: 3 })
        ));
    }

    #[test]
    fn test_read_frame_iteration_cap() {
        let chunks = (0..10)
            .map(|i| if i == 0 { vec![0x00, 0x10] } else { vec![b'x'] })
            .collect();
        let mut reader = Chunked(chunks);
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let n = read_frame(&mut reader, &mut buffer).unwrap();
        assert_eq!(n, 2 + (MAX_READ_ITERATIONS - 1));
    }

    #[test]
    fn test_read_frame_too_large() {
        let mut cursor = Cursor::new(vec![0x04, 0x00, 0x00]);
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        assert!(matches!(
            read_frame(&mut cursor, &mut buffer),
            Err(ExchangeError::FrameTooLarge { size: 1026, max: MAX_FRAME_SIZE })
        ));
    }
}
