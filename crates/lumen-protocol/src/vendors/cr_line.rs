//! CR-terminated ASCII dialect.
//!
//! Commands and replies are short `KEY ARG` lines terminated by `\r`:
//!
//! ```text
//! -> POWR ON\r
//! <- OK\r
//! -> AVOL ?\r
//! <- AVOL 12\r
//! ```
//!
//! Keys: `POWR` (power), `INPT` (input select), `AMUT` (audio mute),
//! `AVOL` (audio volume), `STAT` (composite status), `LAMP` (lamp
//! hours). Replies reuse the command key; `OK` is a bare ack, `NG code`
//! a rejection, `ERR text` a device fault report. No handshake and no
//! per-command ack requirement: flat panels speaking this dialect accept
//! paced fire-and-forget traffic.

use bytes::{BufMut, Bytes, BytesMut};
use lumen_core::{Error, InputSource, Result};

use crate::{Command, CommandCategory, Feedback, ProtocolStrategy};

const CR: u8 = 0x0D;

/// ASCII `KEY ARG\r` command/response dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrLineProtocol;

impl CrLineProtocol {
    pub fn new() -> Self {
        Self
    }

    fn command(category: CommandCategory, body: String) -> Command {
        Command::new(category, Bytes::from(body))
    }
}

impl ProtocolStrategy for CrLineProtocol {
    fn name(&self) -> &'static str {
        "cr-line"
    }

    fn power_on(&self) -> Command {
        Self::command(CommandCategory::PowerOn, "POWR ON".to_string())
    }

    fn power_off(&self) -> Command {
        Self::command(CommandCategory::PowerOff, "POWR OFF".to_string())
    }

    fn power_poll(&self) -> Command {
        Self::command(CommandCategory::PowerPoll, "POWR ?".to_string())
    }

    fn select_input(&self, input: InputSource) -> Command {
        Self::command(CommandCategory::SetInput, format!("INPT {}", input.index()))
    }

    fn set_mute(&self, mute: bool) -> Command {
        let arg = if mute { "ON" } else { "OFF" };
        Self::command(CommandCategory::SetMute, format!("AMUT {arg}"))
    }

    fn set_volume(&self, native: u16) -> Command {
        Self::command(CommandCategory::SetVolume, format!("AVOL {native}"))
    }

    fn volume_step(&self, up: bool) -> Command {
        let arg = if up { "+" } else { "-" };
        Self::command(CommandCategory::VolumeStep, format!("AVOL {arg}"))
    }

    fn volume_poll(&self) -> Command {
        Self::command(CommandCategory::VolumePoll, "AVOL ?".to_string())
    }

    fn status_poll(&self) -> Command {
        Self::command(CommandCategory::StatusPoll, "STAT ?".to_string())
    }

    fn lamp_poll(&self) -> Command {
        Self::command(CommandCategory::LampPoll, "LAMP ?".to_string())
    }

    fn frame(&self, command: &Command) -> Bytes {
        let payload = command.payload();
        let mut buf = BytesMut::with_capacity(payload.len() + 1);
        buf.put_slice(payload);
        buf.put_u8(CR);
        buf.freeze()
    }

    fn decode(&self, frame: &[u8]) -> Result<Feedback> {
        let line = std::str::from_utf8(frame)
            .map_err(|_| Error::MalformedReply("non-UTF8 line".to_string()))?
            .trim();

        if line.is_empty() {
            return Err(Error::MalformedReply("empty line".to_string()));
        }

        let (key, arg) = match line.split_once(' ') {
            Some((key, arg)) => (key, arg.trim()),
            None => (line, ""),
        };

        match key {
            "OK" => Ok(Feedback::Ack),
            "NG" => Ok(Feedback::Nack(arg.to_string())),
            "ERR" => Ok(Feedback::DeviceError(arg.to_string())),
            "POWR" => match arg {
                "ON" => Ok(Feedback::Power(true)),
                "OFF" => Ok(Feedback::Power(false)),
                other => Err(Error::MalformedReply(format!("POWR arg: {other}"))),
            },
            "INPT" => {
                let index: u8 = arg
                    .parse()
                    .map_err(|_| Error::MalformedReply(format!("INPT arg: {arg}")))?;
                Ok(Feedback::Input(index))
            }
            "AMUT" => match arg {
                "ON" => Ok(Feedback::Mute(true)),
                "OFF" => Ok(Feedback::Mute(false)),
                other => Err(Error::MalformedReply(format!("AMUT arg: {other}"))),
            },
            "AVOL" => {
                let volume: u16 = arg
                    .parse()
                    .map_err(|_| Error::MalformedReply(format!("AVOL arg: {arg}")))?;
                Ok(Feedback::Volume(volume))
            }
            "LAMP" => {
                let hours: u32 = arg
                    .parse()
                    .map_err(|_| Error::MalformedReply(format!("LAMP arg: {arg}")))?;
                Ok(Feedback::LampHours(hours))
            }
            other => Err(Error::UnknownReply(other.to_string())),
        }
    }

    fn delimiter(&self) -> u8 {
        CR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_payloads() {
        let proto = CrLineProtocol::new();
        assert_eq!(proto.power_on().payload().as_ref(), b"POWR ON");
        assert_eq!(proto.power_off().payload().as_ref(), b"POWR OFF");
        assert_eq!(proto.power_poll().payload().as_ref(), b"POWR ?");
        assert_eq!(
            proto
                .select_input(InputSource::new(2).unwrap())
                .payload()
                .as_ref(),
            b"INPT 2"
        );
        assert_eq!(proto.set_mute(true).payload().as_ref(), b"AMUT ON");
        assert_eq!(proto.set_volume(12).payload().as_ref(), b"AVOL 12");
        assert_eq!(proto.volume_step(true).payload().as_ref(), b"AVOL +");
        assert_eq!(proto.volume_step(false).payload().as_ref(), b"AVOL -");
    }

    #[test]
    fn test_frame_appends_cr() {
        let proto = CrLineProtocol::new();
        let framed = proto.frame(&proto.power_on());
        assert_eq!(framed.as_ref(), b"POWR ON\r");
    }

    #[test]
    fn test_decode_power_replies() {
        let proto = CrLineProtocol::new();
        assert_eq!(proto.decode(b"POWR ON").unwrap(), Feedback::Power(true));
        assert_eq!(proto.decode(b"POWR OFF").unwrap(), Feedback::Power(false));
    }

    #[test]
    fn test_decode_status_replies() {
        let proto = CrLineProtocol::new();
        assert_eq!(proto.decode(b"INPT 3").unwrap(), Feedback::Input(3));
        assert_eq!(proto.decode(b"AMUT OFF").unwrap(), Feedback::Mute(false));
        assert_eq!(proto.decode(b"AVOL 25").unwrap(), Feedback::Volume(25));
        assert_eq!(
            proto.decode(b"LAMP 1234").unwrap(),
            Feedback::LampHours(1234)
        );
    }

    #[test]
    fn test_decode_ack_nack_error() {
        let proto = CrLineProtocol::new();
        assert_eq!(proto.decode(b"OK").unwrap(), Feedback::Ack);
        assert_eq!(proto.decode(b"NG 02").unwrap(), Feedback::Nack("02".into()));
        assert_eq!(
            proto.decode(b"ERR lamp failure").unwrap(),
            Feedback::DeviceError("lamp failure".into())
        );
    }

    #[test]
    fn test_decode_malformed() {
        let proto = CrLineProtocol::new();
        assert!(proto.decode(b"").is_err());
        assert!(proto.decode(b"POWR MAYBE").is_err());
        assert!(proto.decode(b"AVOL loud").is_err());
        assert!(proto.decode(b"ZZZZ 1").is_err());
        assert!(proto.decode(&[0xFF, 0xFE]).is_err());
    }

    #[test]
    fn test_no_handshake_no_ack_requirement() {
        let proto = CrLineProtocol::new();
        assert!(proto.handshake().is_none());
        assert!(!proto.requires_ack(CommandCategory::SetInput));
        assert!(!proto.requires_ack(CommandCategory::PowerOn));
    }
}
