//! End-to-end broker scenarios at the handler level: presence fan-out,
//! blocked messages, warnings, and chat reflection.

use std::collections::HashSet;
use std::sync::Arc;

use oscar_proto::snac::{SnacHeader, errorcode, foodgroup};
use oscar_proto::snacs::buddy::SUBGROUP_ARRIVED;
use oscar_proto::snacs::feedbag::{
    CLASS_BUDDY, CLASS_DENY, FeedbagItem, Reply, STATUS_SUCCESS, SUBGROUP_INSERT_ITEM,
    SUBGROUP_QUERY, SUBGROUP_REPLY, SUBGROUP_STATUS, Status,
};
use oscar_proto::snacs::oservice::{EvilNotification, SUBGROUP_EVIL_NOTIFICATION};
use oscar_proto::snacs::userinfo;
use oscar_proto::snacs::{buddy, chat as chat_snacs, icbm};
use oscar_proto::tlv::{Tlv, TlvLBlock, TlvRestBlock};
use oscar_proto::wire::{from_bytes, to_bytes};
use oscar_server::chat::ChatRegistry;
use oscar_server::handlers::{self, ServerContext};
use oscar_server::session::{Session, SessionManager, SnacMessage};
use oscar_server::store::{FeedbagStore, SqliteFeedbagStore};
use oscar_server::{ServerConfig, ServerError};

fn test_ctx() -> ServerContext<SqliteFeedbagStore> {
    ServerContext {
        sessions: Arc::new(SessionManager::new()),
        store: SqliteFeedbagStore::open_in_memory().unwrap(),
        chat: Arc::new(ChatRegistry::new()),
        config: ServerConfig::default(),
    }
}

fn signed_on(ctx: &ServerContext<SqliteFeedbagStore>, name: &str) -> Arc<Session> {
    let session = ctx.sessions.new_session();
    session.set_screen_name(name.to_string());
    ctx.store.upsert_user(name).unwrap();
    session
}

fn buddy_item(item_id: u16, name: &str) -> FeedbagItem {
    FeedbagItem {
        name: name.to_string(),
        group_id: 0,
        item_id,
        class_id: CLASS_BUDDY,
        attributes: TlvLBlock::new(),
    }
}

fn deny_item(item_id: u16, name: &str) -> FeedbagItem {
    FeedbagItem {
        name: name.to_string(),
        group_id: 0,
        item_id,
        class_id: CLASS_DENY,
        attributes: TlvLBlock::new(),
    }
}

#[tokio::test]
async fn arrival_reaches_interested_watchers() {
    let ctx = test_ctx();
    let alice = signed_on(&ctx, "alice");
    let bob = signed_on(&ctx, "bob");
    let mut bob_rx = bob.take_receiver().unwrap();
    ctx.store.upsert("bob", &[buddy_item(1, "alice")]).unwrap();

    oscar_server::presence::broadcast_arrival(&ctx, &alice).await.unwrap();

    let msg = bob_rx.recv().await.unwrap();
    assert_eq!(msg.header.food_group, foodgroup::BUDDY);
    assert_eq!(msg.header.subgroup, SUBGROUP_ARRIVED);

    let arrived: buddy::Arrived = from_bytes(&msg.body).unwrap();
    assert_eq!(arrived.user_info.screen_name, "alice");
    assert_eq!(arrived.user_info.warning_level, 0);
    for tag in [
        userinfo::TLV_FLAGS,
        userinfo::TLV_SIGNON_TIME,
        userinfo::TLV_IDLE_TIME,
        userinfo::TLV_STATUS,
    ] {
        assert!(arrived.user_info.tlv_block.has(tag), "missing user-info TLV {tag:#06x}");
    }
    assert_eq!(arrived.user_info.tlv_block.u16(userinfo::TLV_IDLE_TIME), Some(0));
}

#[tokio::test]
async fn departure_carries_no_info_tlvs() {
    let ctx = test_ctx();
    let alice = signed_on(&ctx, "alice");
    let bob = signed_on(&ctx, "bob");
    let mut bob_rx = bob.take_receiver().unwrap();
    ctx.store.upsert("bob", &[buddy_item(1, "alice")]).unwrap();

    oscar_server::presence::broadcast_departure(&ctx, &alice).await.unwrap();

    let msg = bob_rx.recv().await.unwrap();
    assert_eq!(msg.header.subgroup, buddy::SUBGROUP_DEPARTED);
    let departed: buddy::Departed = from_bytes(&msg.body).unwrap();
    assert_eq!(departed.user_info.screen_name, "alice");
    assert!(departed.user_info.tlv_block.tlvs.is_empty());
}

#[tokio::test]
async fn blocked_sender_gets_not_logged_on_and_nothing_is_delivered() {
    let ctx = test_ctx();
    let alice = signed_on(&ctx, "alice");
    let bob = signed_on(&ctx, "bob");
    let mut alice_rx = alice.take_receiver().unwrap();
    // Alice blocks bob
    ctx.store.upsert("alice", &[deny_item(1805, "bob")]).unwrap();

    let request = icbm::ChannelMsgToHost {
        cookie: [7; 8],
        channel_id: 1,
        screen_name: "alice".to_string(),
        tlvs: TlvRestBlock::from(vec![Tlv::new_string(icbm::TLV_MESSAGE, "hi")]),
    };
    let mut body = to_bytes(&request).unwrap();
    let snac = SnacHeader {
        food_group: foodgroup::ICBM,
        subgroup: icbm::SUBGROUP_CHANNEL_MSG_TO_HOST,
        flags: 0,
        request_id: 0x1234,
    };

    let replies = handlers::route_bos(&ctx, &bob, &snac, &mut body).await.unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].header.food_group, foodgroup::ICBM);
    assert_eq!(replies[0].header.subgroup, 0x0001);
    assert_eq!(replies[0].header.request_id, 0x1234);
    let error: oscar_proto::SnacError = from_bytes(&replies[0].body).unwrap();
    assert_eq!(error.code, errorcode::NOT_LOGGED_ON);

    assert!(alice_rx.try_recv().is_err(), "blocked message must not be delivered");
}

#[tokio::test]
async fn message_is_relayed_with_ack_when_requested() {
    let ctx = test_ctx();
    let alice = signed_on(&ctx, "alice");
    let bob = signed_on(&ctx, "bob");
    let mut alice_rx = alice.take_receiver().unwrap();

    let request = icbm::ChannelMsgToHost {
        cookie: [9; 8],
        channel_id: 1,
        screen_name: "alice".to_string(),
        tlvs: TlvRestBlock::from(vec![
            Tlv::new_string(icbm::TLV_MESSAGE, "hello alice"),
            Tlv::new(icbm::TLV_REQUEST_HOST_ACK, Vec::new()),
        ]),
    };
    let mut body = to_bytes(&request).unwrap();
    let snac = SnacHeader {
        food_group: foodgroup::ICBM,
        subgroup: icbm::SUBGROUP_CHANNEL_MSG_TO_HOST,
        flags: 0,
        request_id: 77,
    };

    let replies = handlers::route_bos(&ctx, &bob, &snac, &mut body).await.unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].header.subgroup, icbm::SUBGROUP_HOST_ACK);
    assert_eq!(replies[0].header.request_id, 77);

    let delivered = alice_rx.recv().await.unwrap();
    assert_eq!(delivered.header.subgroup, icbm::SUBGROUP_CHANNEL_MSG_TO_CLIENT);
    let msg: icbm::ChannelMsgToClient = from_bytes(&delivered.body).unwrap();
    assert_eq!(msg.cookie, [9; 8]);
    assert_eq!(msg.user_info.screen_name, "bob");
    assert_eq!(msg.tlvs.string(icbm::TLV_MESSAGE).as_deref(), Some("hello alice"));
}

#[tokio::test]
async fn warning_applies_the_named_delta() {
    let ctx = test_ctx();
    let alice = signed_on(&ctx, "alice");
    let bob = signed_on(&ctx, "bob");
    let mut alice_rx = alice.take_receiver().unwrap();

    let request = icbm::EvilRequest {
        send_as: icbm::EVIL_SEND_AS_NAMED,
        screen_name: "alice".to_string(),
    };
    let mut body = to_bytes(&request).unwrap();
    let snac = SnacHeader {
        food_group: foodgroup::ICBM,
        subgroup: icbm::SUBGROUP_EVIL_REQUEST,
        flags: 0,
        request_id: 5,
    };

    let replies = handlers::route_bos(&ctx, &bob, &snac, &mut body).await.unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].header.subgroup, icbm::SUBGROUP_EVIL_REPLY);
    let reply: icbm::EvilReply = from_bytes(&replies[0].body).unwrap();
    assert_eq!(reply.evil_delta_applied, 100);
    assert_eq!(reply.updated_evil_value, 100);
    assert_eq!(alice.warning_level(), 100);

    let notification = alice_rx.recv().await.unwrap();
    assert_eq!(notification.header.food_group, foodgroup::OSERVICE);
    assert_eq!(notification.header.subgroup, SUBGROUP_EVIL_NOTIFICATION);
    let evil: EvilNotification = from_bytes(&notification.body).unwrap();
    assert_eq!(evil.new_evil, 100);
    assert_eq!(evil.snitcher.unwrap().screen_name, "bob");
}

#[tokio::test]
async fn anonymous_warning_omits_the_snitcher() {
    let ctx = test_ctx();
    let alice = signed_on(&ctx, "alice");
    let bob = signed_on(&ctx, "bob");
    let mut alice_rx = alice.take_receiver().unwrap();

    let request = icbm::EvilRequest {
        send_as: icbm::EVIL_SEND_AS_ANONYMOUS,
        screen_name: "alice".to_string(),
    };
    let mut body = to_bytes(&request).unwrap();
    let snac = SnacHeader::new(foodgroup::ICBM, icbm::SUBGROUP_EVIL_REQUEST);

    let replies = handlers::route_bos(&ctx, &bob, &snac, &mut body).await.unwrap();
    let reply: icbm::EvilReply = from_bytes(&replies[0].body).unwrap();
    assert_eq!(reply.evil_delta_applied, 30);
    assert_eq!(reply.updated_evil_value, 30);

    let evil: EvilNotification = from_bytes(&alice_rx.recv().await.unwrap().body).unwrap();
    assert!(evil.snitcher.is_none());
}

#[tokio::test]
async fn self_warning_is_refused() {
    let ctx = test_ctx();
    let bob = signed_on(&ctx, "bob");

    let request = icbm::EvilRequest {
        send_as: icbm::EVIL_SEND_AS_NAMED,
        screen_name: "bob".to_string(),
    };
    let mut body = to_bytes(&request).unwrap();
    let snac = SnacHeader::new(foodgroup::ICBM, icbm::SUBGROUP_EVIL_REQUEST);

    let replies = handlers::route_bos(&ctx, &bob, &snac, &mut body).await.unwrap();
    let error: oscar_proto::SnacError = from_bytes(&replies[0].body).unwrap();
    assert_eq!(error.code, errorcode::NOT_SUPPORTED_BY_HOST);
    assert_eq!(bob.warning_level(), 0);
}

#[tokio::test]
async fn chat_message_reaches_other_members_with_sender_stamp() {
    let ctx = test_ctx();
    let room = ctx.chat.create_room("lobby", 4);
    let a = room.sessions.new_session();
    a.set_screen_name("a".to_string());
    let b = room.sessions.new_session();
    b.set_screen_name("b".to_string());
    let c = room.sessions.new_session();
    c.set_screen_name("c".to_string());
    let mut b_rx = b.take_receiver().unwrap();
    let mut c_rx = c.take_receiver().unwrap();

    let request = chat_snacs::ChannelMsgToHost {
        cookie: [1; 8],
        channel_id: 3,
        tlvs: TlvRestBlock::from(vec![Tlv::new_string(chat_snacs::TLV_MESSAGE_INFO, "hey room")]),
    };
    let mut body = to_bytes(&request).unwrap();
    let snac = SnacHeader::new(foodgroup::CHAT, chat_snacs::SUBGROUP_CHANNEL_MSG_TO_HOST);

    let replies = handlers::chat::handle(&room, &a, &snac, &mut body).await.unwrap();
    assert!(replies.is_empty(), "no reflection without TLV 0x06");

    for rx in [&mut b_rx, &mut c_rx] {
        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.header.subgroup, chat_snacs::SUBGROUP_CHANNEL_MSG_TO_CLIENT);
        let msg: chat_snacs::ChannelMsgToClient = from_bytes(&delivered.body).unwrap();
        let stamp = msg.tlvs.bytes(chat_snacs::TLV_SENDER_INFO).unwrap();
        let sender: oscar_proto::snacs::TlvUserInfo = from_bytes(&stamp).unwrap();
        assert_eq!(sender.screen_name, "a");
    }
}

#[tokio::test]
async fn chat_reflection_echoes_to_the_sender_too() {
    let ctx = test_ctx();
    let room = ctx.chat.create_room("lobby", 4);
    let a = room.sessions.new_session();
    a.set_screen_name("a".to_string());
    let b = room.sessions.new_session();
    b.set_screen_name("b".to_string());
    let mut b_rx = b.take_receiver().unwrap();

    let request = chat_snacs::ChannelMsgToHost {
        cookie: [2; 8],
        channel_id: 3,
        tlvs: TlvRestBlock::from(vec![
            Tlv::new_string(chat_snacs::TLV_MESSAGE_INFO, "echo me"),
            Tlv::new(chat_snacs::TLV_ENABLE_REFLECTION, Vec::new()),
        ]),
    };
    let mut body = to_bytes(&request).unwrap();
    let snac = SnacHeader::new(foodgroup::CHAT, chat_snacs::SUBGROUP_CHANNEL_MSG_TO_HOST);

    let replies = handlers::chat::handle(&room, &a, &snac, &mut body).await.unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].header.subgroup, chat_snacs::SUBGROUP_CHANNEL_MSG_TO_CLIENT);
    assert!(b_rx.recv().await.is_some());
}

#[tokio::test]
async fn feedbag_insert_then_query_round_trips() {
    let ctx = test_ctx();
    let mike = signed_on(&ctx, "mike");

    let item = FeedbagItem {
        name: "spimmer".to_string(),
        group_id: 0,
        item_id: 1805,
        class_id: CLASS_DENY,
        attributes: TlvLBlock::from(vec![Tlv::new_u16(0x0001, 1000)]),
    };
    let mut body = to_bytes(&vec![item.clone()]).unwrap();
    let insert = SnacHeader {
        food_group: foodgroup::FEEDBAG,
        subgroup: SUBGROUP_INSERT_ITEM,
        flags: 0,
        request_id: 9,
    };
    let replies = handlers::route_bos(&ctx, &mike, &insert, &mut body).await.unwrap();
    assert_eq!(replies[0].header.subgroup, SUBGROUP_STATUS);
    assert_eq!(replies[0].header.request_id, 9);
    let status: Status = from_bytes(&replies[0].body).unwrap();
    assert_eq!(status.results, vec![STATUS_SUCCESS]);

    let query = SnacHeader::new(foodgroup::FEEDBAG, SUBGROUP_QUERY);
    let mut body = bytes::Bytes::new();
    let replies = handlers::route_bos(&ctx, &mike, &query, &mut body).await.unwrap();
    assert_eq!(replies[0].header.subgroup, SUBGROUP_REPLY);
    let reply: Reply = from_bytes(&replies[0].body).unwrap();
    assert_eq!(reply.items, vec![item]);
    assert!(reply.last_update > 0);
}

#[tokio::test]
async fn unknown_subgroup_keeps_the_connection_alive() {
    let ctx = test_ctx();
    let bob = signed_on(&ctx, "bob");

    let snac = SnacHeader::new(foodgroup::BUDDY, 0x7F);
    let mut body = bytes::Bytes::new();
    let replies = handlers::route_bos(&ctx, &bob, &snac, &mut body).await.unwrap();
    assert_eq!(replies.len(), 1);
    let error: oscar_proto::SnacError = from_bytes(&replies[0].body).unwrap();
    assert_eq!(error.code, errorcode::NOT_SUPPORTED_BY_HOST);
}

#[tokio::test]
async fn unknown_food_group_is_fatal() {
    let ctx = test_ctx();
    let bob = signed_on(&ctx, "bob");

    let snac = SnacHeader::new(0x0099, 0x0001);
    let mut body = bytes::Bytes::new();
    match handlers::route_bos(&ctx, &bob, &snac, &mut body).await {
        Err(ServerError::RouteNotFound(group)) => assert_eq!(group, 0x0099),
        other => panic!("expected fatal routing error, got {other:?}"),
    }
}

#[tokio::test]
async fn n_parallel_senders_deliver_exactly_n() {
    const SENDERS: u16 = 24;

    let manager = Arc::new(SessionManager::new());
    let recipient = manager.new_session();
    recipient.set_screen_name("target".to_string());
    let mut rx = recipient.take_receiver().unwrap();

    let consumer = tokio::spawn(async move {
        let mut seen = HashSet::new();
        while seen.len() < usize::from(SENDERS) {
            let msg = rx.recv().await.expect("channel closed early");
            let value: u16 = from_bytes(&msg.body).unwrap();
            assert!(seen.insert(value), "duplicate delivery of {value}");
        }
        (seen, rx)
    });

    let mut senders = Vec::new();
    for i in 0..SENDERS {
        let manager = Arc::clone(&manager);
        senders.push(tokio::spawn(async move {
            let msg = SnacMessage::new(foodgroup::BUDDY, SUBGROUP_ARRIVED, &i).unwrap();
            manager.send_to_screen_name("target", msg).await;
        }));
    }
    for sender in senders {
        sender.await.unwrap();
    }

    let (seen, mut rx) = consumer.await.unwrap();
    assert_eq!(seen.len(), usize::from(SENDERS));
    assert!(rx.try_recv().is_err(), "no extra deliveries");
}
