//! Checksummed binary-framed dialect.
//!
//! Messages are `STX body checksum ETX`, where the body is a short ASCII
//! opcode with hex-encoded arguments and the checksum is the additive sum
//! of the body bytes, rendered as two uppercase hex digits:
//!
//! ```text
//! -> \x02PW1 D8\x03        power on
//! <- \x02AK 86\x03         accepted
//! -> \x02VL1F <ck>\x03     volume = 0x1F
//! <- \x02VL1F <ck>\x03     volume readback
//! ```
//!
//! Body opcodes: `PW1`/`PW0`/`PW?` power, `INx` input, `MU1`/`MU0`
//! mute, `VLxx` volume (hex), `V+`/`V-` ramp step, `VL?` volume poll,
//! `ST?` status, `LP?` lamp hours (`LPxxxxxx` reply, hex), `ID?`
//! handshake, `RD` ready reply, `AK` ack, `NKxx` rejection, `ER...`
//! device fault text.
//!
//! Projectors speaking this dialect acknowledge every state-changing
//! command and silently drop commands that arrive before the previous
//! ack, so [`requires_ack`](ProtocolStrategy::requires_ack) is true for
//! all non-poll categories.

use bytes::{BufMut, Bytes, BytesMut};
use lumen_core::{Error, InputSource, Result};

use crate::{Command, CommandCategory, Feedback, ProtocolStrategy};

const STX: u8 = 0x02;
const ETX: u8 = 0x03;

/// Binary `STX body checksum ETX` dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct EtxFrameProtocol;

impl EtxFrameProtocol {
    pub fn new() -> Self {
        Self
    }

    fn command(category: CommandCategory, body: impl Into<Bytes>) -> Command {
        Command::new(category, body.into())
    }

    /// Additive checksum over the body bytes, truncated to one byte.
    fn checksum(body: &[u8]) -> u8 {
        body.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
    }

    fn checksum_hex(body: &[u8]) -> [u8; 2] {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";
        let sum = Self::checksum(body);
        [HEX[(sum >> 4) as usize], HEX[(sum & 0x0F) as usize]]
    }

    fn parse_hex(digits: &str) -> Result<u32> {
        u32::from_str_radix(digits, 16)
            .map_err(|_| Error::MalformedReply(format!("bad hex field: {digits}")))
    }
}

impl ProtocolStrategy for EtxFrameProtocol {
    fn name(&self) -> &'static str {
        "etx-frame"
    }

    fn power_on(&self) -> Command {
        Self::command(CommandCategory::PowerOn, &b"PW1"[..])
    }

    fn power_off(&self) -> Command {
        Self::command(CommandCategory::PowerOff, &b"PW0"[..])
    }

    fn power_poll(&self) -> Command {
        Self::command(CommandCategory::PowerPoll, &b"PW?"[..])
    }

    fn select_input(&self, input: InputSource) -> Command {
        Self::command(
            CommandCategory::SetInput,
            Bytes::from(format!("IN{:X}", input.index())),
        )
    }

    fn set_mute(&self, mute: bool) -> Command {
        let body: &[u8] = if mute { b"MU1" } else { b"MU0" };
        Self::command(CommandCategory::SetMute, body)
    }

    fn set_volume(&self, native: u16) -> Command {
        Self::command(
            CommandCategory::SetVolume,
            Bytes::from(format!("VL{:02X}", native.min(0xFF))),
        )
    }

    fn volume_step(&self, up: bool) -> Command {
        let body: &[u8] = if up { b"V+" } else { b"V-" };
        Self::command(CommandCategory::VolumeStep, body)
    }

    fn volume_poll(&self) -> Command {
        Self::command(CommandCategory::VolumePoll, &b"VL?"[..])
    }

    fn status_poll(&self) -> Command {
        Self::command(CommandCategory::StatusPoll, &b"ST?"[..])
    }

    fn lamp_poll(&self) -> Command {
        Self::command(CommandCategory::LampPoll, &b"LP?"[..])
    }

    fn handshake(&self) -> Option<Command> {
        Some(Self::command(CommandCategory::Handshake, &b"ID?"[..]))
    }

    fn frame(&self, command: &Command) -> Bytes {
        let body = command.payload();
        let ck = Self::checksum_hex(body);

        let mut buf = BytesMut::with_capacity(body.len() + 5);
        buf.put_u8(STX);
        buf.put_slice(body);
        buf.put_u8(b' ');
        buf.put_slice(&ck);
        buf.put_u8(ETX);
        buf.freeze()
    }

    fn decode(&self, frame: &[u8]) -> Result<Feedback> {
        // Delimiter (ETX) is stripped by the codec; the frame must still
        // open with STX and close with the checksum field.
        let Some((&STX, rest)) = frame.split_first() else {
            return Err(Error::MalformedReply("missing STX".to_string()));
        };

        if rest.len() < 4 {
            return Err(Error::MalformedReply(format!(
                "frame too short: {} bytes",
                rest.len()
            )));
        }

        let (body, ck_field) = rest.split_at(rest.len() - 3);
        if ck_field[0] != b' ' {
            return Err(Error::MalformedReply("missing checksum field".to_string()));
        }

        let expected = Self::checksum_hex(body);
        if ck_field[1..] != expected {
            return Err(Error::ChecksumMismatch {
                expected: Self::checksum(body),
                actual: Self::parse_hex(&String::from_utf8_lossy(&ck_field[1..])).unwrap_or(0)
                    as u8,
            });
        }

        let body = std::str::from_utf8(body)
            .map_err(|_| Error::MalformedReply("non-UTF8 body".to_string()))?;

        match body {
            "AK" => Ok(Feedback::Ack),
            "RD" => Ok(Feedback::Ready),
            "PW1" => Ok(Feedback::Power(true)),
            "PW0" => Ok(Feedback::Power(false)),
            "MU1" => Ok(Feedback::Mute(true)),
            "MU0" => Ok(Feedback::Mute(false)),
            _ if body.starts_with("NK") => Ok(Feedback::Nack(body[2..].to_string())),
            _ if body.starts_with("ER") => Ok(Feedback::DeviceError(body[2..].to_string())),
            _ if body.starts_with("IN") => {
                let index = Self::parse_hex(&body[2..])?;
                Ok(Feedback::Input(index as u8))
            }
            _ if body.starts_with("VL") => {
                let volume = Self::parse_hex(&body[2..])?;
                Ok(Feedback::Volume(volume as u16))
            }
            _ if body.starts_with("LP") => {
                let hours = Self::parse_hex(&body[2..])?;
                Ok(Feedback::LampHours(hours))
            }
            other => Err(Error::UnknownReply(other.to_string())),
        }
    }

    fn delimiter(&self) -> u8 {
        ETX
    }

    fn requires_ack(&self, category: CommandCategory) -> bool {
        !category.is_poll()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed_reply(body: &[u8]) -> Vec<u8> {
        // A reply as the codec hands it to decode(): STX + body +
        // checksum field, ETX already stripped.
        let ck = EtxFrameProtocol::checksum_hex(body);
        let mut frame = vec![STX];
        frame.extend_from_slice(body);
        frame.push(b' ');
        frame.extend_from_slice(&ck);
        frame
    }

    #[test]
    fn test_frame_layout() {
        let proto = EtxFrameProtocol::new();
        let framed = proto.frame(&proto.power_on());

        assert_eq!(framed[0], STX);
        assert_eq!(*framed.last().unwrap(), ETX);
        assert_eq!(&framed[1..4], b"PW1");
        assert_eq!(framed[4], b' ');
    }

    #[test]
    fn test_checksum_additive() {
        // 'P' + 'W' + '1' = 0x50 + 0x57 + 0x31 = 0xD8
        assert_eq!(EtxFrameProtocol::checksum(b"PW1"), 0xD8);
        assert_eq!(EtxFrameProtocol::checksum_hex(b"PW1"), *b"D8");
    }

    #[test]
    fn test_frame_decode_round_trip() {
        let proto = EtxFrameProtocol::new();
        let framed = proto.frame(&proto.volume_poll());

        // Strip the ETX the codec would consume.
        let frame = &framed[..framed.len() - 1];
        // VL? is a poll request, not a reply the device sends, but the
        // wire format is symmetric so decode must reject only unknown
        // bodies, not the framing.
        assert!(matches!(
            proto.decode(frame),
            Err(Error::UnknownReply(_)) | Ok(_)
        ));
    }

    #[test]
    fn test_decode_replies() {
        let proto = EtxFrameProtocol::new();
        assert_eq!(proto.decode(&framed_reply(b"AK")).unwrap(), Feedback::Ack);
        assert_eq!(proto.decode(&framed_reply(b"RD")).unwrap(), Feedback::Ready);
        assert_eq!(
            proto.decode(&framed_reply(b"PW1")).unwrap(),
            Feedback::Power(true)
        );
        assert_eq!(
            proto.decode(&framed_reply(b"IN3")).unwrap(),
            Feedback::Input(3)
        );
        assert_eq!(
            proto.decode(&framed_reply(b"VL1F")).unwrap(),
            Feedback::Volume(0x1F)
        );
        assert_eq!(
            proto.decode(&framed_reply(b"LP0004D2")).unwrap(),
            Feedback::LampHours(1234)
        );
        assert_eq!(
            proto.decode(&framed_reply(b"NK02")).unwrap(),
            Feedback::Nack("02".into())
        );
        assert_eq!(
            proto.decode(&framed_reply(b"ERfan stall")).unwrap(),
            Feedback::DeviceError("fan stall".into())
        );
    }

    #[test]
    fn test_decode_rejects_bad_checksum() {
        let proto = EtxFrameProtocol::new();
        let mut frame = framed_reply(b"PW1");
        let last = frame.len() - 1;
        frame[last] = b'0'; // corrupt checksum digit

        assert!(matches!(
            proto.decode(&frame),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_missing_stx() {
        let proto = EtxFrameProtocol::new();
        let frame = &framed_reply(b"PW1")[1..];
        assert!(proto.decode(frame).is_err());
    }

    #[test]
    fn test_decode_rejects_short_frames() {
        let proto = EtxFrameProtocol::new();
        assert!(proto.decode(&[]).is_err());
        assert!(proto.decode(&[STX]).is_err());
        assert!(proto.decode(&[STX, b'A']).is_err());
    }

    #[test]
    fn test_ack_required_for_non_polls() {
        let proto = EtxFrameProtocol::new();
        assert!(proto.requires_ack(CommandCategory::PowerOn));
        assert!(proto.requires_ack(CommandCategory::SetInput));
        assert!(proto.requires_ack(CommandCategory::VolumeStep));
        assert!(!proto.requires_ack(CommandCategory::PowerPoll));
        assert!(!proto.requires_ack(CommandCategory::StatusPoll));
    }

    #[test]
    fn test_handshake_present() {
        let proto = EtxFrameProtocol::new();
        let handshake = proto.handshake().unwrap();
        assert_eq!(handshake.category(), CommandCategory::Handshake);
        assert_eq!(handshake.payload().as_ref(), b"ID?");
    }

    #[test]
    fn test_volume_clamped_to_byte() {
        let proto = EtxFrameProtocol::new();
        assert_eq!(proto.set_volume(0x1FF).payload().as_ref(), b"VLFF");
    }
}
