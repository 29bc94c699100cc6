//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use std::{cmp::Ordering, fmt};

use advisor_chat_shared::time::{now_utc, to_rfc3339_millis};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::ValueObjectError;

/// Separator between the two participant ids of a room name.
pub const ROOM_SEPARATOR: &str = "-";

/// Prefix of client-assigned message ids.
pub const TEMPORARY_ID_PREFIX: &str = "temp-";

/// User identifier value object.
///
/// Opaque identifier issued by the identity system. It is guaranteed not to
/// contain the room separator by its issuer, so no escaping is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a new UserId.
    ///
    /// # Errors
    ///
    /// Returns `ValueObjectError::UserIdEmpty` if `id` is empty or whitespace
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.trim().is_empty() {
            return Err(ValueObjectError::UserIdEmpty);
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room name value object.
///
/// A conversation between two users is the unordered pair of their ids. The
/// room name is both ids sorted and joined with [`ROOM_SEPARATOR`], so both
/// participants compute the same name regardless of who opened it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RoomName(String);

impl RoomName {
    /// Compute the room name for a pair of participants.
    pub fn for_participants(a: &UserId, b: &UserId) -> Self {
        let (first, second) = match compare_utf16(a.as_str(), b.as_str()) {
            Ordering::Greater => (b, a),
            _ => (a, b),
        };
        Self(format!("{}{}{}", first, ROOM_SEPARATOR, second))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compare two strings by UTF-16 code units.
///
/// This is the default ordering of JavaScript's `Array.prototype.sort`, which
/// the backend uses for room names. It differs from `str::cmp` for characters
/// outside the Basic Multilingual Plane.
fn compare_utf16(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

/// Message identifier value object.
///
/// Server-assigned for persisted messages. Optimistic entries carry a
/// client-assigned id starting with [`TEMPORARY_ID_PREFIX`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageId(String);

impl MessageId {
    /// Create a MessageId from a server-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `ValueObjectError::MessageIdEmpty` if `id` is empty
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::MessageIdEmpty);
        }
        Ok(Self(id))
    }

    /// Generate a temporary id for an optimistic message.
    pub fn temporary() -> Self {
        Self(format!("{}{}", TEMPORARY_ID_PREFIX, uuid::Uuid::new_v4()))
    }

    /// Whether this id was assigned by the client.
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_ID_PREFIX)
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MessageId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MessageId> for String {
    fn from(value: MessageId) -> Self {
        value.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message content value object.
///
/// Holds the trimmed text of a message, which is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageContent(String);

impl MessageContent {
    /// Create a new MessageContent from user input or a server payload.
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns `ValueObjectError::MessageContentEmpty` if nothing is left after trimming
    pub fn new(content: &str) -> Result<Self, ValueObjectError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::MessageContentEmpty);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<MessageContent> for String {
    fn from(value: MessageContent) -> Self {
        value.0
    }
}

impl fmt::Display for MessageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp value object.
///
/// A UTC point in time, exchanged as an ISO-8601 string. Display-only: the
/// client never orders messages by timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Wrap a UTC time.
    pub fn new(value: DateTime<Utc>) -> Self {
        Self(value)
    }

    /// Current time.
    pub fn now() -> Self {
        Self(now_utc())
    }

    /// Parse an RFC 3339 / ISO-8601 string.
    ///
    /// A date-time without an offset is taken as UTC.
    ///
    /// # Errors
    ///
    /// Returns `ValueObjectError::TimestampInvalid` if the string cannot be parsed
    pub fn parse(value: &str) -> Result<Self, ValueObjectError> {
        if let Ok(t) = DateTime::parse_from_rfc3339(value) {
            return Ok(Self(t.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|t| Self(t.and_utc()))
            .map_err(|_| ValueObjectError::TimestampInvalid(value.to_string()))
    }

    /// Get the inner value.
    pub fn value(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", to_rfc3339_millis(&self.0))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_rfc3339_millis(&self.0))
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    #[test]
    fn test_user_id_new_success() {
        // テスト項目: 有効なユーザー ID を作成できる
        // when (操作):
        let result = UserId::new("a1".to_string());

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "a1");
    }

    #[test]
    fn test_user_id_new_empty_fails() {
        // テスト項目: 空のユーザー ID は作成できない
        // when (操作):
        let result = UserId::new("  ".to_string());

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), ValueObjectError::UserIdEmpty);
    }

    #[test]
    fn test_user_id_accepts_uuid() {
        // テスト項目: 区切り文字を含む UUID もそのまま受け付ける（エスケープしない）
        // given (前提条件):
        let id = "0b7c4c1e-8f0e-4a53-9a55-3c1d2e4f5a6b".to_string();

        // when (操作):
        let result = UserId::new(id.clone());

        // then (期待する結果):
        assert_eq!(result.unwrap().as_str(), id);
    }

    #[test]
    fn test_room_name_is_sorted_join() {
        // テスト項目: ルーム名は 2 つの ID をソートしてハイフンで連結したもの
        // when (操作):
        let room = RoomName::for_participants(&user("b2"), &user("a1"));

        // then (期待する結果):
        assert_eq!(room.as_str(), "a1-b2");
    }

    #[test]
    fn test_room_name_is_symmetric() {
        // テスト項目: どちらのユーザーから計算しても同じルーム名になる
        // given (前提条件):
        let pairs = [
            ("a1", "b2"),
            ("advisor-42", "student-7"),
            ("Zed", "alice"),
            ("10", "9"),
            ("same", "same"),
            ("ä", "z"),
        ];

        for (a, b) in pairs {
            // when (操作):
            let ab = RoomName::for_participants(&user(a), &user(b));
            let ba = RoomName::for_participants(&user(b), &user(a));

            // then (期待する結果):
            assert_eq!(ab, ba, "room({a},{b}) != room({b},{a})");
        }
    }

    #[test]
    fn test_room_name_uses_string_ordering_not_numeric() {
        // テスト項目: 数値ではなく文字列として比較される（"10" < "9"）
        // when (操作):
        let room = RoomName::for_participants(&user("9"), &user("10"));

        // then (期待する結果):
        assert_eq!(room.as_str(), "10-9");
    }

    #[test]
    fn test_room_name_orders_by_utf16_code_units() {
        // テスト項目: BMP 外の文字は UTF-16 コードユニット順で比較される
        // given (前提条件):
        // U+1F600 is encoded as the surrogate pair D83D DE00, which sorts
        // before U+FF21 in UTF-16 but after it in code point order.
        let emoji = user("\u{1F600}");
        let fullwidth = user("\u{FF21}");

        // when (操作):
        let room = RoomName::for_participants(&fullwidth, &emoji);

        // then (期待する結果):
        assert_eq!(room.as_str(), "\u{1F600}-\u{FF21}");
    }

    #[test]
    fn test_message_id_temporary_is_prefixed_and_unique() {
        // テスト項目: 一時 ID はプレフィックス付きで毎回異なる
        // when (操作):
        let id1 = MessageId::temporary();
        let id2 = MessageId::temporary();

        // then (期待する結果):
        assert!(id1.is_temporary());
        assert!(id1.as_str().starts_with(TEMPORARY_ID_PREFIX));
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_message_id_server_is_not_temporary() {
        // テスト項目: サーバー ID は一時 ID として扱われない
        // when (操作):
        let id = MessageId::new("srv-1".to_string()).unwrap();

        // then (期待する結果):
        assert!(!id.is_temporary());
    }

    #[test]
    fn test_message_content_is_trimmed() {
        // テスト項目: メッセージ内容は前後の空白が除去される
        // when (操作):
        let content = MessageContent::new("  hello \n").unwrap();

        // then (期待する結果):
        assert_eq!(content.as_str(), "hello");
    }

    #[test]
    fn test_message_content_whitespace_only_fails() {
        // テスト項目: 空白のみのメッセージ内容は作成できない
        // when (操作):
        let result = MessageContent::new(" \t\n ");

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), ValueObjectError::MessageContentEmpty);
    }

    #[test]
    fn test_timestamp_parse_and_display() {
        // テスト項目: ISO-8601 文字列をパースし、ミリ秒精度で表示できる
        // when (操作):
        let ts = Timestamp::parse("2024-05-01T19:00:00+09:00").unwrap();

        // then (期待する結果):
        assert_eq!(
            ts.value(),
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(ts.to_string(), "2024-05-01T10:00:00.000Z");
    }

    #[test]
    fn test_timestamp_parse_without_offset_is_utc() {
        // テスト項目: オフセット無しの日時は UTC として扱われる
        // when (操作):
        let plain = Timestamp::parse("2024-05-01T10:00:00").unwrap();
        let fractional = Timestamp::parse("2024-05-01T10:00:00.250").unwrap();

        // then (期待する結果):
        assert_eq!(
            plain.value(),
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(fractional.to_string(), "2024-05-01T10:00:00.250Z");
    }

    #[test]
    fn test_timestamp_parse_invalid_fails() {
        // テスト項目: 不正なタイムスタンプ文字列はエラーになる
        // when (操作):
        let result = Timestamp::parse("yesterday");

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            ValueObjectError::TimestampInvalid("yesterday".to_string())
        );
    }
}
