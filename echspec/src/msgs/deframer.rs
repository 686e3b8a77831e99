use std::collections::VecDeque;
use std::io;

use crate::msgs::codec;
use crate::msgs::message::{MessageError, OpaqueMessage};

/// This deframer works to reconstruct TLS records
/// from arbitrary-sized reads, buffering as necessary.
/// The input is `read()`, the output is the `frames` deque.
pub struct MessageDeframer {
    /// Completed frames for output.
    pub frames: VecDeque<OpaqueMessage>,

    /// Set to true if the peer is not talking TLS, but some other
    /// protocol.  The caller should abort the connection, because
    /// the deframer cannot recover.
    pub desynced: bool,

    /// A fixed-size buffer containing the currently-accumulating
    /// TLS record.
    buf: Box<[u8; OpaqueMessage::MAX_WIRE_SIZE]>,

    /// What size prefix of `buf` is used.
    used: usize,
}

enum BufferContents {
    /// Contains an invalid message as a header.
    Invalid,

    /// Might contain a valid message if we receive more.
    /// Perhaps totally empty!
    Partial,

    /// Contains a valid frame as a prefix.
    Valid,
}

impl Default for MessageDeframer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageDeframer {
    pub fn new() -> Self {
        Self {
            frames: VecDeque::new(),
            desynced: false,
            buf: Box::new([0u8; OpaqueMessage::MAX_WIRE_SIZE]),
            used: 0,
        }
    }

    /// Read some bytes from `rd`, and add them to our internal
    /// buffer.  If this means our internal buffer contains
    /// full records, decode them all.
    ///
    /// A return of zero means the peer closed the stream.
    pub fn read(&mut self, rd: &mut dyn io::Read) -> io::Result<usize> {
        debug_assert!(self.used <= OpaqueMessage::MAX_WIRE_SIZE);
        let new_bytes = rd.read(&mut self.buf[self.used..])?;

        self.used += new_bytes;

        loop {
            match self.try_deframe_one() {
                BufferContents::Invalid => {
                    self.desynced = true;
                    break;
                }
                BufferContents::Valid => continue,
                BufferContents::Partial => break,
            }
        }

        Ok(new_bytes)
    }

    /// Returns true if we have records for the caller
    /// to process, either whole records in our output
    /// queue or partial records in our buffer.
    pub fn has_pending(&self) -> bool {
        !self.frames.is_empty() || self.used > 0
    }

    /// Does our `buf` contain a full record?  It does if it is big enough to
    /// contain a header, and that header has a length which falls within `buf`.
    /// If so, deframe it and place the record onto the frames output queue.
    fn try_deframe_one(&mut self) -> BufferContents {
        let mut rd = codec::Reader::init(&self.buf[..self.used]);

        match OpaqueMessage::read(&mut rd) {
            Ok(m) => {
                let used = rd.used();
                self.frames.push_back(m);
                self.buf_consume(used);
                BufferContents::Valid
            }
            Err(MessageError::TooShortForHeader) | Err(MessageError::TooShortForLength) => {
                BufferContents::Partial
            }
            Err(_) => BufferContents::Invalid,
        }
    }

    #[allow(clippy::comparison_chain)]
    fn buf_consume(&mut self, taken: usize) {
        if taken < self.used {
            /* Before:
             * +----------+----------+----------+
             * | taken    | pending  |xxxxxxxxxx|
             * +----------+----------+----------+
             * 0          ^ taken    ^ self.used
             *
             * After:
             * +----------+----------+----------+
             * | pending  |xxxxxxxxxxxxxxxxxxxxx|
             * +----------+----------+----------+
             * 0          ^ self.used
             */

            self.buf
                .copy_within(taken..self.used, 0);
            self.used -= taken;
        } else if taken == self.used {
            self.used = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::ContentType;
    use std::io;

    struct ByteRead<'a> {
        buf: &'a [u8],
        offs: usize,
    }

    impl<'a> ByteRead<'a> {
        fn new(bytes: &'a [u8]) -> Self {
            ByteRead {
                buf: bytes,
                offs: 0,
            }
        }
    }

    impl io::Read for ByteRead<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut len = 0;

            while len < buf.len() && len < self.buf.len() - self.offs {
                buf[len] = self.buf[self.offs + len];
                len += 1;
            }

            self.offs += len;

            Ok(len)
        }
    }

    const ALERT: &[u8] = &[0x15, 0x03, 0x03, 0x00, 0x02, 0x02, 0x28];
    const CCS: &[u8] = &[0x14, 0x03, 0x03, 0x00, 0x01, 0x01];

    fn input_bytes(d: &mut MessageDeframer, bytes: &[u8]) -> io::Result<usize> {
        let mut rd = ByteRead::new(bytes);
        d.read(&mut rd)
    }

    #[test]
    fn check_incremental() {
        let mut d = MessageDeframer::new();
        assert!(!d.has_pending());
        for i in 0..ALERT.len() - 1 {
            assert_eq!(input_bytes(&mut d, &ALERT[i..i + 1]).unwrap(), 1);
            assert!(d.has_pending());
            assert!(d.frames.is_empty());
        }
        input_bytes(&mut d, &ALERT[ALERT.len() - 1..]).unwrap();
        assert_eq!(d.frames.len(), 1);
        assert_eq!(
            d.frames.pop_front().unwrap().typ,
            ContentType::Alert
        );
        assert!(!d.has_pending());
        assert!(!d.desynced);
    }

    #[test]
    fn check_two_in_one_read() {
        let mut d = MessageDeframer::new();
        let mut both = CCS.to_vec();
        both.extend_from_slice(ALERT);
        assert_eq!(input_bytes(&mut d, &both).unwrap(), both.len());
        assert_eq!(d.frames.len(), 2);
        assert_eq!(
            d.frames.pop_front().unwrap().typ,
            ContentType::ChangeCipherSpec
        );
        assert_eq!(
            d.frames.pop_front().unwrap().typ,
            ContentType::Alert
        );
    }

    #[test]
    fn check_desync_on_garbage() {
        let mut d = MessageDeframer::new();
        input_bytes(&mut d, b"SSH-2.0-OpenSSH_9.6\r\n").unwrap();
        assert!(d.desynced);
        assert!(d.frames.is_empty());
    }

    #[test]
    fn check_eof_reads_zero() {
        let mut d = MessageDeframer::new();
        assert_eq!(input_bytes(&mut d, &[]).unwrap(), 0);
        assert!(!d.has_pending());
    }
}
