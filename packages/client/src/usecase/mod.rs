//! UseCase 層
//!
//! 会話ルームと会話一覧の状態機械を実装するレイヤー。
//! UI 層から呼び出され、Domain 層のポート（MessageStore / RealtimeTransport）を操作します。

pub mod conversation_list;
pub mod conversation_room;
pub mod error;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use conversation_list::{ConversationList, ListViewState};
pub use conversation_room::{ConversationRoom, RoomViewState};
pub use error::ConversationError;
pub use state::ViewStatus;
