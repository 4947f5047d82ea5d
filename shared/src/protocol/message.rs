//! The message envelope: one type byte followed by a type-specific payload.

use super::map_event::MapEvent;
use super::payload::{LoginPayload, OptionsPayload, PlayerPayload, PositionPayload, SetMapPayload};
use super::wire::{DecodeError, EncodeError, WireReader, WireWriter};
use crate::model::{BombKind, EntityId, Phase};
use crate::time::Span;

byte_enum! {
    /// Why a login was denied or a player was removed. Sent as `i32`.
    pub enum ReasonCode {
        Disconnected = 0,
        VersionMismatch = 1,
        IllegalLogin = 2,
        GameNotFound = 3,
        GameNotJoinable = 4,
        GameFull = 5,
        HostKick = 6,
        CheatKick = 7,
        EndKick = 8,
        AbortedKick = 9,
    }
}

byte_enum! {
    pub enum MessageType {
        CreateGame = 0,
        JoinGame = 1,
        StartGame = 2,
        ContinueGame = 3,
        PlayerPosition = 4,
        PlayerBomb = 5,
        PlayerDetonate = 6,
        Kicked = 7,
        DeniedGame = 8,
        EnteredGame = 9,
        PlayerJoined = 10,
        PlayerLeft = 11,
        PlayerState = 12,
        ChangePhase = 13,
        SetMap = 14,
        SetTimeLimit = 15,
        TimeUp = 16,
        MapEvent = 17,
        Chat = 18,
        Options = 19,
        PauseGame = 20,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageEvent {
    CreateGame(LoginPayload),
    JoinGame(LoginPayload),
    StartGame,
    ContinueGame(bool),
    PlayerPosition(PositionPayload),
    PlayerBomb(BombKind),
    PlayerDetonate(EntityId),
    Kicked(ReasonCode),
    DeniedGame(ReasonCode),
    EnteredGame,
    PlayerJoined(PlayerPayload),
    PlayerLeft(u8),
    PlayerState(PlayerPayload),
    ChangePhase(Phase),
    SetMap(SetMapPayload),
    SetTimeLimit(Span),
    TimeUp,
    MapEvent(MapEvent),
    Chat(String),
    Options(OptionsPayload),
    PauseGame(bool),
}

fn write_login(w: &mut WireWriter, login: &LoginPayload) -> Result<(), EncodeError> {
    w.string(&login.token)?;
    w.string(&login.name)?;
    w.i32(login.version);
    Ok(())
}

fn read_login(r: &mut WireReader<'_>) -> Result<LoginPayload, DecodeError> {
    Ok(LoginPayload {
        token: r.string()?,
        name: r.string()?,
        version: r.i32()?,
    })
}

fn write_player(w: &mut WireWriter, player: &PlayerPayload) -> Result<(), EncodeError> {
    w.u8(player.id);
    w.bool(player.waiting);
    w.bool(player.game_over);
    w.bool(player.host);
    w.bool(player.local);
    w.string(&player.name)?;
    w.i32(player.score);
    w.i32(player.wins);
    w.i32(player.stock);
    Ok(())
}

fn read_player(r: &mut WireReader<'_>) -> Result<PlayerPayload, DecodeError> {
    Ok(PlayerPayload {
        id: r.u8()?,
        waiting: r.bool()?,
        game_over: r.bool()?,
        host: r.bool()?,
        local: r.bool()?,
        name: r.string()?,
        score: r.i32()?,
        wins: r.i32()?,
        stock: r.i32()?,
    })
}

fn write_tag<T: Into<u8>>(w: &mut WireWriter, tag: T) {
    let value: u8 = tag.into();
    w.i32(value as i32);
}

impl MessageEvent {
    pub fn message_type(&self) -> MessageType {
        match self {
            MessageEvent::CreateGame(_) => MessageType::CreateGame,
            MessageEvent::JoinGame(_) => MessageType::JoinGame,
            MessageEvent::StartGame => MessageType::StartGame,
            MessageEvent::ContinueGame(_) => MessageType::ContinueGame,
            MessageEvent::PlayerPosition(_) => MessageType::PlayerPosition,
            MessageEvent::PlayerBomb(_) => MessageType::PlayerBomb,
            MessageEvent::PlayerDetonate(_) => MessageType::PlayerDetonate,
            MessageEvent::Kicked(_) => MessageType::Kicked,
            MessageEvent::DeniedGame(_) => MessageType::DeniedGame,
            MessageEvent::EnteredGame => MessageType::EnteredGame,
            MessageEvent::PlayerJoined(_) => MessageType::PlayerJoined,
            MessageEvent::PlayerLeft(_) => MessageType::PlayerLeft,
            MessageEvent::PlayerState(_) => MessageType::PlayerState,
            MessageEvent::ChangePhase(_) => MessageType::ChangePhase,
            MessageEvent::SetMap(_) => MessageType::SetMap,
            MessageEvent::SetTimeLimit(_) => MessageType::SetTimeLimit,
            MessageEvent::TimeUp => MessageType::TimeUp,
            MessageEvent::MapEvent(_) => MessageType::MapEvent,
            MessageEvent::Chat(_) => MessageType::Chat,
            MessageEvent::Options(_) => MessageType::Options,
            MessageEvent::PauseGame(_) => MessageType::PauseGame,
        }
    }

    pub fn encode(&self, w: &mut WireWriter) -> Result<(), EncodeError> {
        w.u8(self.message_type().into());
        match self {
            MessageEvent::CreateGame(login) | MessageEvent::JoinGame(login) => {
                write_login(w, login)?
            }
            MessageEvent::ContinueGame(answer) => w.bool(*answer),
            MessageEvent::PlayerPosition(p) => w.record(p)?,
            MessageEvent::PlayerBomb(kind) => write_tag(w, *kind),
            MessageEvent::PlayerDetonate(id) => w.u16(*id),
            MessageEvent::Kicked(reason) | MessageEvent::DeniedGame(reason) => {
                write_tag(w, *reason)
            }
            MessageEvent::PlayerJoined(p) | MessageEvent::PlayerState(p) => write_player(w, p)?,
            MessageEvent::PlayerLeft(id) => w.u8(*id),
            MessageEvent::ChangePhase(phase) => write_tag(w, *phase),
            MessageEvent::SetMap(p) => w.record(p)?,
            MessageEvent::SetTimeLimit(limit) => w.span(*limit),
            MessageEvent::MapEvent(event) => event.encode(w)?,
            MessageEvent::Chat(text) => w.string(text)?,
            MessageEvent::Options(p) => w.record(p)?,
            MessageEvent::PauseGame(paused) => w.bool(*paused),
            MessageEvent::StartGame | MessageEvent::EnteredGame | MessageEvent::TimeUp => {}
        }
        Ok(())
    }

    pub fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        let message = match MessageType::try_from(r.u8()?)? {
            MessageType::CreateGame => MessageEvent::CreateGame(read_login(r)?),
            MessageType::JoinGame => MessageEvent::JoinGame(read_login(r)?),
            MessageType::StartGame => MessageEvent::StartGame,
            MessageType::ContinueGame => MessageEvent::ContinueGame(r.bool()?),
            MessageType::PlayerPosition => MessageEvent::PlayerPosition(r.record()?),
            MessageType::PlayerBomb => MessageEvent::PlayerBomb(BombKind::try_from(r.i32()?)?),
            MessageType::PlayerDetonate => MessageEvent::PlayerDetonate(r.u16()?),
            MessageType::Kicked => MessageEvent::Kicked(ReasonCode::try_from(r.i32()?)?),
            MessageType::DeniedGame => MessageEvent::DeniedGame(ReasonCode::try_from(r.i32()?)?),
            MessageType::EnteredGame => MessageEvent::EnteredGame,
            MessageType::PlayerJoined => MessageEvent::PlayerJoined(read_player(r)?),
            MessageType::PlayerLeft => MessageEvent::PlayerLeft(r.u8()?),
            MessageType::PlayerState => MessageEvent::PlayerState(read_player(r)?),
            MessageType::ChangePhase => MessageEvent::ChangePhase(Phase::try_from(r.i32()?)?),
            MessageType::SetMap => MessageEvent::SetMap(r.record()?),
            MessageType::SetTimeLimit => MessageEvent::SetTimeLimit(r.span()?),
            MessageType::TimeUp => MessageEvent::TimeUp,
            MessageType::MapEvent => MessageEvent::MapEvent(MapEvent::decode(r)?),
            MessageType::Chat => MessageEvent::Chat(r.string()?),
            MessageType::Options => MessageEvent::Options(r.record()?),
            MessageType::PauseGame => MessageEvent::PauseGame(r.bool()?),
        };
        Ok(message)
    }

    /// Encodes a complete message body (no frame header).
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        let mut w = WireWriter::new();
        self.encode(&mut w)?;
        Ok(w.into_bytes())
    }

    /// Decodes exactly one message body, rejecting leftover bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = WireReader::new(bytes);
        let message = Self::decode(&mut r)?;
        r.finish()?;
        Ok(message)
    }
}
