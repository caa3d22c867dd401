//! Decode-safety properties: no packet decoder may panic, read out of
//! bounds, or produce out-of-range validated fields, for any input bytes.

use proptest::prelude::*;

use sqlgrind_packet::validate::ceilings;
use sqlgrind_packet::{
    AdvancedHeader, AllocPacket, AutoVacuumPacket, ConfigPacket, CursorPacket, LifecyclePacket,
    TransPacket,
};

proptest! {
    #[test]
    fn decoders_never_panic(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = AllocPacket::decode(&data);
        let _ = AutoVacuumPacket::decode(&data);
        let _ = TransPacket::decode(&data);
        let _ = CursorPacket::decode(&data);
        let _ = LifecyclePacket::decode(&data);
        let _ = ConfigPacket::decode(&data);
        let _ = AdvancedHeader::decode(&data);
    }

    #[test]
    fn short_buffers_decode_to_none(data in proptest::collection::vec(any::<u8>(), 0..32)) {
        prop_assert!(AllocPacket::decode(&data).is_none());
        prop_assert!(AutoVacuumPacket::decode(&data).is_none());
        if data.len() < 32 {
            prop_assert!(TransPacket::decode(&data).is_none());
            prop_assert!(CursorPacket::decode(&data).is_none());
            prop_assert!(LifecyclePacket::decode(&data).is_none());
            prop_assert!(ConfigPacket::decode(&data).is_none());
        }
    }

    #[test]
    fn validated_quantities_stay_bounded(data in proptest::collection::vec(any::<u8>(), 48..96)) {
        if let Some((packet, _)) = AllocPacket::decode(&data) {
            if let Some(v) = packet.validate() {
                prop_assert!(v.nearby_pgno <= ceilings::MAX_PGNO_HINT);
                prop_assert!(v.heap_pressure <= ceilings::MAX_HEAP_PRESSURE);
                prop_assert!((1..=50).contains(&v.row_budget));
            }
        }
        if let Some((packet, _)) = AutoVacuumPacket::decode(&data) {
            if let Some(v) = packet.validate() {
                prop_assert!((1..=ceilings::MAX_FILL_ROWS).contains(&v.fill_rows));
                prop_assert!((1..=ceilings::MAX_VACUUM_PAGES).contains(&v.vacuum_pages));
            }
        }
        if let Some((packet, _)) = LifecyclePacket::decode(&data) {
            if let Some(v) = packet.validate() {
                prop_assert!((1..=ceilings::MAX_TABLE_COUNT).contains(&v.table_count));
                prop_assert!((1..=ceilings::MAX_ROWS_PER_TABLE).contains(&v.rows_per_table));
                prop_assert!((1..=ceilings::MAX_BLOB_BYTES).contains(&v.blob_bytes));
            }
        }
    }

    #[test]
    fn decode_and_tail_partition_the_input(data in proptest::collection::vec(any::<u8>(), 48..128)) {
        let (_, tail) = AllocPacket::decode(&data).unwrap();
        prop_assert_eq!(tail.len(), data.len() - 48);
        prop_assert_eq!(tail, &data[48..]);
    }
}
