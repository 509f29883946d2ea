//! BUCP authentication (food group `0x0017`).
//!
//! Two-step challenge/response. The challenge reply carries an opaque auth
//! key; this server hands out the freshly allocated session cookie and does
//! not verify the password hash in the login request.

use crate::tlv::TlvRestBlock;
use crate::{OscarMarshal, OscarUnmarshal};

/// Login request with credentials.
pub const SUBGROUP_LOGIN_REQUEST: u16 = 0x0002;
/// Login reply with the BOS address and cookie.
pub const SUBGROUP_LOGIN_RESPONSE: u16 = 0x0003;
/// Client asks for an auth challenge.
pub const SUBGROUP_CHALLENGE_REQUEST: u16 = 0x0006;
/// Challenge reply carrying the auth key.
pub const SUBGROUP_CHALLENGE_RESPONSE: u16 = 0x0007;

/// Screen-name TLV, in requests and the login reply.
pub const TLV_SCREEN_NAME: u16 = 0x0001;
/// Login-reply TLV: error URL; blank on success.
pub const TLV_ERROR_URL: u16 = 0x0004;
/// Login-reply TLV: `host:port` of the BOS service.
pub const TLV_RECONNECT_HOST: u16 = 0x0005;
/// Login-reply TLV: cookie to present at the BOS endpoint.
pub const TLV_AUTH_COOKIE: u16 = 0x0006;
/// Login-reply TLV: error subcode.
pub const TLV_ERROR_SUBCODE: u16 = 0x0008;
/// Login-reply TLV: account email.
pub const TLV_EMAIL: u16 = 0x0011;
/// Login-request TLV: MD5 password response (not verified here).
pub const TLV_PASSWORD_HASH: u16 = 0x0025;
/// Login-reply TLV: password-reset URL.
pub const TLV_PASSWORD_RESET_URL: u16 = 0x0054;

/// Challenge request body.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct ChallengeRequest {
    /// Request TLVs; may carry the screen name
    pub tlvs: TlvRestBlock,
}

/// Challenge reply body.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct ChallengeResponse {
    /// Opaque auth key; here, the allocated session cookie
    #[oscar(len_prefix = "uint16")]
    pub auth_key: String,
}

/// Login request body.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct LoginRequest {
    /// Credential TLVs
    pub tlvs: TlvRestBlock,
}

/// Login reply body.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct LoginResponse {
    /// Screen name, cookie, BOS address, and account TLVs
    pub tlvs: TlvRestBlock,
}
