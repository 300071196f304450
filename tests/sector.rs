mod common;

use common::*;
use efmfox::{
    encoder::{modulate, ChannelEncoder},
    prelude::*,
    sector::{edc::edc, SectorBuilder, EDC_OFFSET, SECTOR_SIZE},
    QChannel,
    Sector,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn decode_one(sector: &[u8; SECTOR_SIZE], index: u32) -> Decoded {
    let mut encoder = ChannelEncoder::new();
    encoder.push_padding(LEAD_FRAMES);
    encoder.push_sector(sector, Some(&position_q(index)));
    encoder.flush();
    decode_channel(&modulate(encoder.frames()))
}

#[test]
fn test_edc_matches_built_sectors() {
    init();
    for index in [150u32, 4_499, 75 * 60 * 10 + 3, 449_999] {
        let sector = build_sector(index);
        let stored = u32::from_le_bytes(sector[EDC_OFFSET..EDC_OFFSET + 4].try_into().unwrap());
        assert_eq!(stored, edc(&sector[..EDC_OFFSET]), "sector {}", index);

        let parsed = Sector::from_raw(Box::new(sector), vec![false; SECTOR_SIZE], false);
        assert_eq!(parsed.status, SectorStatus::Ok);
        assert_eq!(parsed.address, Some(TrackTime::from_index(index)));
    }
}

#[test]
fn test_bit_flips_repaired_by_ecc() {
    init();
    let mut rng = StdRng::seed_from_u64(7);
    let clean = build_sector(200);

    for _ in 0..32 {
        let mut damaged = clean;
        let offset = rng.gen_range(16..EDC_OFFSET);
        damaged[offset] ^= 1 << rng.gen_range(0..8);

        let sector = Sector::from_raw(Box::new(damaged), vec![false; SECTOR_SIZE], false);
        assert_eq!(sector.status, SectorStatus::Corrected, "offset {}", offset);
        assert_eq!(sector.as_bytes(), &clean[..]);
    }
}

#[test]
fn test_ecc_repair_through_pipeline() {
    init();
    let mut damaged = build_sector(300);
    damaged[1000] ^= 0x10;
    let decoded = decode_one(&damaged, 300);

    assert_eq!(decoded.report.c1.corrected, 0);
    assert_eq!(decoded.sectors.len(), 1);
    let (sector, meta) = &decoded.sectors[0];
    assert_eq!(sector.status, SectorStatus::Corrected);
    assert_eq!(meta.line(), format!("00:04:00,1,corrected,{},{}", meta.c1, meta.c2));
    assert_eq!(sector.as_bytes(), &build_sector(300)[..]);
}

#[test]
fn test_edc_failure_keeps_data() {
    init();
    let mut damaged = build_sector(300);
    for b in damaged[100..700].iter_mut() {
        *b ^= 0xA5;
    }
    let decoded = decode_one(&damaged, 300);

    assert_eq!(decoded.sectors.len(), 1);
    let (sector, meta) = &decoded.sectors[0];
    assert_eq!(sector.status, SectorStatus::EdcFail);
    assert!(meta.status.is_bad());
    assert_eq!(sector.address, Some(TrackTime::from_index(300)));
    assert_eq!(sector.as_bytes(), &damaged[..]);
}

#[test]
fn test_mode2_sector() {
    init();
    let payload: Vec<u8> = (0..2336usize).map(|i| (i * 3) as u8).collect();
    let raw = SectorBuilder::new(TrackTime::from_index(151))
        .mode(SectorMode::Mode2)
        .build(&payload)
        .unwrap();
    let decoded = decode_one(&raw, 151);

    assert_eq!(decoded.sectors.len(), 1);
    let (sector, meta) = &decoded.sectors[0];
    assert_eq!(sector.mode, SectorMode::Mode2);
    assert_eq!(sector.status, SectorStatus::Ok);
    assert_eq!(sector.user_data(), &payload[..]);
    assert!(meta.line().starts_with("00:02:01,2,ok,"));
}

#[test]
fn test_q_crc_detects_bit_flips() {
    init();
    let q = position_q(1234);
    assert!(q.crc_ok);
    assert_eq!(q.absolute, Some(TrackTime::from_index(1234)));

    for byte in 0..12 {
        for bit in 0..8 {
            let mut raw = q.raw;
            raw[byte] ^= 1 << bit;
            assert!(!QChannel::from_raw(raw).crc_ok, "byte {} bit {}", byte, bit);
        }
    }
}
