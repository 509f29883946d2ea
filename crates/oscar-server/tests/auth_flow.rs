//! BUCP challenge/login flow against the real auth connection loop.

use std::sync::Arc;

use oscar_proto::snac::{SnacHeader, foodgroup};
use oscar_proto::snacs::auth;
use oscar_proto::tlv::{Tlv, TlvRestBlock};
use oscar_proto::wire::{Unmarshal, from_bytes, to_bytes};
use oscar_proto::FlapFrameType;
use oscar_server::chat::ChatRegistry;
use oscar_server::endpoint::run_auth_connection;
use oscar_server::frame::{FlapReader, FlapWriter};
use oscar_server::handlers::ServerContext;
use oscar_server::session::SessionManager;
use oscar_server::store::{FeedbagStore, SqliteFeedbagStore};
use oscar_server::ServerConfig;

fn test_ctx() -> ServerContext<SqliteFeedbagStore> {
    ServerContext {
        sessions: Arc::new(SessionManager::new()),
        store: SqliteFeedbagStore::open_in_memory().unwrap(),
        chat: Arc::new(ChatRegistry::new()),
        config: ServerConfig::default(),
    }
}

#[tokio::test]
async fn challenge_then_login_mints_a_usable_session() {
    let ctx = test_ctx();
    let (client, server) = tokio::io::duplex(16 * 1024);
    let worker = tokio::spawn(run_auth_connection(ctx.clone(), server));

    let (read_half, write_half) = tokio::io::split(client);
    let mut reader = FlapReader::new(read_half);
    let mut writer = FlapWriter::new(write_half);

    let (greeting, _) = reader.read_frame().await.unwrap();
    assert_eq!(greeting.frame_type, FlapFrameType::SignOn);
    writer.send_signon(TlvRestBlock::new()).await.unwrap();

    // Challenge: the auth key is the freshly allocated session cookie
    let challenge = auth::ChallengeRequest {
        tlvs: TlvRestBlock::from(vec![Tlv::new_string(auth::TLV_SCREEN_NAME, "alice")]),
    };
    writer
        .send_snac(
            &SnacHeader {
                food_group: foodgroup::BUCP,
                subgroup: auth::SUBGROUP_CHALLENGE_REQUEST,
                flags: 0,
                request_id: 1,
            },
            &to_bytes(&challenge).unwrap(),
        )
        .await
        .unwrap();

    let (_, payload) = reader.read_frame().await.unwrap();
    let mut body = payload;
    let snac = SnacHeader::unmarshal(&mut body).unwrap();
    assert_eq!(snac.subgroup, auth::SUBGROUP_CHALLENGE_RESPONSE);
    assert_eq!(snac.request_id, 1);
    let challenge_reply: auth::ChallengeResponse = from_bytes(&body).unwrap();
    let auth_key = challenge_reply.auth_key;
    assert!(ctx.sessions.retrieve(&auth_key).is_some());

    // Login: names the challenge session and returns the hand-off data
    let login = auth::LoginRequest {
        tlvs: TlvRestBlock::from(vec![
            Tlv::new_string(auth::TLV_SCREEN_NAME, "alice"),
            Tlv::new_string(auth::TLV_PASSWORD_HASH, "not checked"),
        ]),
    };
    writer
        .send_snac(
            &SnacHeader {
                food_group: foodgroup::BUCP,
                subgroup: auth::SUBGROUP_LOGIN_REQUEST,
                flags: 0,
                request_id: 2,
            },
            &to_bytes(&login).unwrap(),
        )
        .await
        .unwrap();

    let (_, payload) = reader.read_frame().await.unwrap();
    let mut body = payload;
    let snac = SnacHeader::unmarshal(&mut body).unwrap();
    assert_eq!(snac.subgroup, auth::SUBGROUP_LOGIN_RESPONSE);
    assert_eq!(snac.request_id, 2);
    let response: auth::LoginResponse = from_bytes(&body).unwrap();

    assert_eq!(response.tlvs.string(auth::TLV_SCREEN_NAME).as_deref(), Some("alice"));
    assert_eq!(response.tlvs.string(auth::TLV_AUTH_COOKIE).as_deref(), Some(auth_key.as_str()));
    assert_eq!(
        response.tlvs.string(auth::TLV_RECONNECT_HOST).as_deref(),
        Some("127.0.0.1:5191")
    );
    assert!(response.tlvs.has(auth::TLV_ERROR_SUBCODE));
    assert!(response.tlvs.has(auth::TLV_EMAIL));
    assert!(response.tlvs.has(auth::TLV_PASSWORD_RESET_URL));

    writer.send_signoff().await.unwrap();
    worker.await.unwrap().unwrap();

    // The session survives the auth connection for the BOS hand-off
    let session = ctx.sessions.retrieve(&auth_key).unwrap();
    assert_eq!(session.screen_name(), "alice");
    // And the user row exists
    assert_eq!(ctx.store.retrieve_profile("alice").unwrap(), "");
}

#[tokio::test]
async fn abandoned_challenge_session_is_reaped() {
    let ctx = test_ctx();
    let (client, server) = tokio::io::duplex(16 * 1024);
    let worker = tokio::spawn(run_auth_connection(ctx.clone(), server));

    let (read_half, write_half) = tokio::io::split(client);
    let mut reader = FlapReader::new(read_half);
    let mut writer = FlapWriter::new(write_half);

    let _ = reader.read_frame().await.unwrap();
    writer.send_signon(TlvRestBlock::new()).await.unwrap();

    writer
        .send_snac(
            &SnacHeader::new(foodgroup::BUCP, auth::SUBGROUP_CHALLENGE_REQUEST),
            &to_bytes(&auth::ChallengeRequest::default()).unwrap(),
        )
        .await
        .unwrap();
    let (_, payload) = reader.read_frame().await.unwrap();
    let mut body = payload;
    let _ = SnacHeader::unmarshal(&mut body).unwrap();
    let challenge_reply: auth::ChallengeResponse = from_bytes(&body).unwrap();

    // Disconnect without logging in
    writer.send_signoff().await.unwrap();
    worker.await.unwrap().unwrap();

    assert!(ctx.sessions.retrieve(&challenge_reply.auth_key).is_none());
}
