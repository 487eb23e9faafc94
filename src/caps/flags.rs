//! Well-known capability identifiers negotiated with Talk servers.
//!
//! These are the flag names as they appear in the `spreed.features` list of a
//! capability payload. Absence of a flag always means "not supported".

pub const CAP_SYSTEM_MESSAGES: &str = "system-messages";
pub const CAP_NOTIFICATION_LEVELS: &str = "notification-levels";
pub const CAP_INVITE_GROUPS_AND_MAILS: &str = "invite-groups-and-mails";
pub const CAP_LOCKED_ONE_TO_ONE_ROOMS: &str = "locked-one-to-one-rooms";
pub const CAP_WEBINARY_LOBBY: &str = "webinary-lobby";
pub const CAP_CHAT_READ_MARKER: &str = "chat-read-marker";
pub const CAP_CHAT_READ_STATUS: &str = "chat-read-status";
pub const CAP_CHAT_READ_LAST: &str = "chat-read-last";
pub const CAP_CHAT_UNREAD: &str = "chat-unread";
pub const CAP_CHAT_PERMISSION: &str = "chat-permission";
pub const CAP_CHAT_REFERENCE_ID: &str = "chat-reference-id";
pub const CAP_CHAT_KEEP_NOTIFICATIONS: &str = "chat-keep-notifications";
pub const CAP_START_CALL_FLAG: &str = "start-call-flag";
pub const CAP_CIRCLES_SUPPORT: &str = "circles-support";
pub const CAP_PHONEBOOK_SEARCH: &str = "phonebook-search";
pub const CAP_READ_ONLY_ROOMS: &str = "read-only-rooms";
pub const CAP_LISTABLE_ROOMS: &str = "listable-rooms";
pub const CAP_DELETE_MESSAGES: &str = "delete-messages";
pub const CAP_DELETE_MESSAGES_UNLIMITED: &str = "delete-messages-unlimited";
pub const CAP_ROOM_DESCRIPTION: &str = "room-description";
pub const CAP_TEMP_USER_AVATAR_API: &str = "temp-user-avatar-api";
pub const CAP_LOCATION_SHARING: &str = "geo-location-sharing";
pub const CAP_CONVERSATION_V4: &str = "conversation-v4";
pub const CAP_CONVERSATION_PERMISSIONS: &str = "conversation-permissions";
pub const CAP_CONVERSATION_AVATARS: &str = "avatar";
pub const CAP_SIP_SUPPORT: &str = "sip-support";
pub const CAP_SIP_SUPPORT_NOPIN: &str = "sip-support-nopin";
pub const CAP_VOICE_MESSAGE: &str = "voice-message-sharing";
pub const CAP_SIGNALING_V3: &str = "signaling-v3";
pub const CAP_CLEAR_HISTORY: &str = "clear-history";
pub const CAP_DIRECT_MENTION_FLAG: &str = "direct-mention-flag";
pub const CAP_NOTIFICATION_CALLS: &str = "notification-calls";
pub const CAP_REACTIONS: &str = "reactions";
pub const CAP_UNIFIED_SEARCH: &str = "unified-search";
pub const CAP_MESSAGE_EXPIRATION: &str = "message-expiration";
pub const CAP_SILENT_SEND: &str = "silent-send";
pub const CAP_SILENT_CALL: &str = "silent-call";
pub const CAP_SEND_CALL_NOTIFICATION: &str = "send-call-notification";
pub const CAP_TALK_POLLS: &str = "talk-polls";
pub const CAP_RAISE_HAND: &str = "raise-hand";
pub const CAP_RECORDING_V1: &str = "recording-v1";
pub const CAP_SINGLE_CONV_STATUS: &str = "single-conversation-status";
pub const CAP_TYPING_INDICATORS: &str = "typing-privacy";
pub const CAP_PUBLISHING_PERMISSIONS: &str = "publishing-permissions";
pub const CAP_REMIND_ME_LATER: &str = "remind-me-later";
pub const CAP_MARKDOWN_MESSAGES: &str = "markdown-messages";
pub const CAP_NOTE_TO_SELF: &str = "note-to-self";
pub const CAP_MEDIA_CAPTION: &str = "media-caption";
pub const CAP_EDIT_MESSAGES: &str = "edit-messages";
pub const CAP_TRANSLATIONS: &str = "translations";
pub const CAP_FEDERATION_V1: &str = "federation-v1";
pub const CAP_BAN_V1: &str = "ban-v1";

/// Flag present in the `notifications` capability subtree when the server
/// ships the notifications app at all.
pub const NOTIFICATIONS_CAP_EXISTS: &str = "exists";

/// The oldest server feature level this client still talks to. Consulted by
/// the login/compatibility check before an account is created.
pub const MINIMUM_REQUIRED_CAPABILITY: &str = CAP_CONVERSATION_V4;
