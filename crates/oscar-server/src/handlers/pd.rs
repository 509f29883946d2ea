//! Permit/deny handlers. The state itself lives in feedbag class-2/class-3
//! items; only the rights query is answered here.

use bytes::Bytes;

use crate::error::ServerError;
use crate::session::SnacMessage;
use oscar_proto::snac::{SnacHeader, errorcode};
use oscar_proto::snacs::pd::{
    RIGHTS_TLV_MAX_DENIES, RIGHTS_TLV_MAX_PERMITS, RightsReply, SUBGROUP_RIGHTS_QUERY,
    SUBGROUP_RIGHTS_REPLY,
};
use oscar_proto::tlv::{Tlv, TlvRestBlock};

/// Handles one permit/deny SNAC.
pub fn handle(snac: &SnacHeader, _body: &mut Bytes) -> Result<Vec<SnacMessage>, ServerError> {
    match snac.subgroup {
        SUBGROUP_RIGHTS_QUERY => {
            let tlvs = TlvRestBlock::from(vec![
                Tlv::new_u16(RIGHTS_TLV_MAX_PERMITS, 100),
                Tlv::new_u16(RIGHTS_TLV_MAX_DENIES, 100),
            ]);
            Ok(vec![SnacMessage::reply(snac, SUBGROUP_RIGHTS_REPLY, &RightsReply { tlvs })?])
        }
        _ => Ok(vec![SnacMessage::error(snac, errorcode::NOT_SUPPORTED_BY_HOST)?]),
    }
}
