//! Buddy handlers. Arrival/departure pushes originate in the presence
//! module; this food group only answers the rights query.

use bytes::Bytes;

use crate::error::ServerError;
use crate::session::SnacMessage;
use oscar_proto::snac::{SnacHeader, errorcode};
use oscar_proto::snacs::buddy::{
    RIGHTS_TLV_MAX_BUDDIES, RIGHTS_TLV_MAX_WATCHERS, RightsQuery, RightsReply,
    SUBGROUP_RIGHTS_QUERY, SUBGROUP_RIGHTS_REPLY,
};
use oscar_proto::tlv::{Tlv, TlvRestBlock};
use oscar_proto::wire::Unmarshal;

/// Handles one Buddy SNAC.
pub fn handle(snac: &SnacHeader, body: &mut Bytes) -> Result<Vec<SnacMessage>, ServerError> {
    match snac.subgroup {
        SUBGROUP_RIGHTS_QUERY => {
            let _ = RightsQuery::unmarshal(body)?;
            let tlvs = TlvRestBlock::from(vec![
                Tlv::new_u16(RIGHTS_TLV_MAX_BUDDIES, 100),
                Tlv::new_u16(RIGHTS_TLV_MAX_WATCHERS, 100),
            ]);
            Ok(vec![SnacMessage::reply(snac, SUBGROUP_RIGHTS_REPLY, &RightsReply { tlvs })?])
        }
        _ => Ok(vec![SnacMessage::error(snac, errorcode::NOT_SUPPORTED_BY_HOST)?]),
    }
}
