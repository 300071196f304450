mod common;

use common::*;
use efmfox::{
    circ::CircDecoder,
    encoder::{modulate, ChannelEncoder, CircEncoder},
    prelude::*,
    AddressSource,
    Sector,
    F1_FRAME_BYTES,
    FRAMES_PER_SECTOR,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const SECTOR_START: u32 = 150;

fn addr(index: u32) -> TrackTime {
    TrackTime::from_index(index)
}

#[test]
fn test_circ_zero_frames() {
    init();
    let mut encoder = CircEncoder::new();
    let mut decoder = CircDecoder::new();

    let mut out = Vec::new();
    for _ in 0..200 {
        let payload = encoder.encode(&[0; F1_FRAME_BYTES]);
        out.extend(decoder.process(F2Frame::new(payload)));
    }
    assert_eq!(out.len(), 200 - 108);
    assert!(out[0].is_lead_in() && out[1].is_lead_in());
    for frame in out.iter().skip(2) {
        assert_eq!(frame.data, [0; F1_FRAME_BYTES]);
        assert!(!frame.has_errors());
    }

    decoder.flush();
    out.extend(decoder.drain());
    assert_eq!(out.len(), 200);
    assert!(out.last().unwrap().has_errors());
}

#[test]
fn test_single_sector() {
    init();
    let frames = synth_frames(SECTOR_START, 1);
    let decoded = decode_channel(&modulate(&frames));

    assert_eq!(decoded.report.delineator.resyncs, 0);
    assert_eq!(decoded.report.f3_frames, frames.len() as u64);
    assert_eq!(decoded.sectors.len(), 1);

    let (sector, meta) = &decoded.sectors[0];
    assert_eq!(sector.address, Some(addr(SECTOR_START)));
    assert_eq!(sector.status, SectorStatus::Ok);
    assert_eq!(sector.user_data(), &user_pattern()[..]);
    assert_eq!(meta.source, AddressSource::Both);
    assert_eq!(meta.line(), format!("00:02:00,1,ok,{},{}", meta.c1, meta.c2));

    // The sector is emitted as soon as its last F1 frame leaves the CIRC delays.
    assert!(decoded.f1_before_finish >= LEAD_FRAMES + FRAMES_PER_SECTOR);
    assert_eq!(
        compute_slice_hash(&decoded.image()),
        compute_slice_hash(&build_sector(SECTOR_START))
    );
}

#[test]
fn test_single_c1_error() {
    init();
    let mut frames = synth_frames(SECTOR_START, 1);
    frames[50].payload[16] ^= 0x5A;
    let decoded = decode_frames(&frames);

    assert_eq!(decoded.report.c1.corrected, 1);
    assert_eq!(decoded.report.c1.failed, 0);
    assert_eq!(decoded.sectors.len(), 1);

    let (sector, meta) = &decoded.sectors[0];
    assert_eq!(sector.status, SectorStatus::Ok);
    assert_eq!(meta.c1.corrected, 1);
    assert_eq!(sector.user_data(), &user_pattern()[..]);
}

#[test]
fn test_c1_failure_repaired_by_c2() {
    init();
    let mut frames = synth_frames(SECTOR_START, 1);
    let frame = &mut frames[128];
    for i in 0..5 {
        frame.payload[i] ^= 0x55;
        frame.erasures[i] = true;
    }
    let decoded = decode_frames(&frames);

    assert!(decoded.report.c1.failed >= 1);
    assert!(decoded.report.c2.corrected > 0);
    assert_eq!(decoded.sectors.len(), 1);

    let (sector, meta) = &decoded.sectors[0];
    assert_eq!(sector.status, SectorStatus::Corrected);
    assert!(meta.is_corrected());
    assert!(!sector.has_errors());
    assert_eq!(sector.user_data(), &user_pattern()[..]);
}

#[test]
fn test_missing_syncs_are_predicted() {
    init();
    let frames = synth_frames(SECTOR_START, 1);
    let mut bits = modulate(&frames);
    for k in 60..64 {
        let b = k * 588 + 11;
        bits[b / 8] ^= 0x80 >> (b % 8);
    }
    let decoded = decode_channel(&bits);

    assert_eq!(decoded.report.delineator.predicted, 4);
    assert_eq!(decoded.report.delineator.resyncs, 0);
    assert_eq!(decoded.report.c1.failed, 0);
    assert_eq!(decoded.sectors.len(), 1);
    assert_eq!(decoded.sectors[0].0.status, SectorStatus::Ok);
    assert_eq!(decoded.sectors[0].0.user_data(), &user_pattern()[..]);
}

#[test]
fn test_truncated_input() {
    init();
    let mut frames = synth_frames(SECTOR_START, 3);
    frames.truncate(250);
    let decoded = decode_frames(&frames);

    let records: Vec<_> = decoded.records.iter().take(3).collect();
    assert_eq!(records.len(), 3);

    assert_eq!(records[0].address, addr(SECTOR_START));
    assert_eq!(records[0].status, SectorStatus::Ok);

    // The second sector's header survived but its tail is flagged past repair.
    assert_eq!(records[1].address, addr(SECTOR_START + 1));
    assert_eq!(records[1].mode, Some(SectorMode::Mode1));
    assert_eq!(records[1].status, SectorStatus::EdcFail);
    assert_eq!(records[1].source, AddressSource::Both);

    // Only a fragment of the third was received.
    assert_eq!(records[2].address, addr(SECTOR_START + 2));
    assert_eq!(records[2].mode, None);
    assert_eq!(records[2].status, SectorStatus::Lost);
    assert_eq!(records[2].source, AddressSource::Interpolated);
    assert!(records[2].line().starts_with("00:02:02,-,lost,"));

    assert_eq!(decoded.sectors.len(), 2);
    assert_eq!(decoded.image().len(), 2 * 2352);
    assert_eq!(decoded.report.sectors.bad_total(), 2);
}

#[test]
fn test_consecutive_sectors() {
    init();
    let count = 5;
    let frames = synth_frames(SECTOR_START, count);
    let decoded = decode_channel(&modulate(&frames));

    assert_eq!(decoded.sectors.len(), count as usize);
    for (i, (sector, meta)) in decoded.sectors.iter().enumerate() {
        assert_eq!(sector.address, Some(addr(SECTOR_START + i as u32)));
        assert_eq!(sector.status, SectorStatus::Ok);
        assert_eq!(meta.source, AddressSource::Both);
    }
    assert!(decoded
        .sectors
        .windows(2)
        .all(|w| w[1].1.address.index() == w[0].1.address.index() + 1));

    let absolute: Vec<Option<TrackTime>> = decoded.q.iter().map(|q| q.absolute).collect();
    let expected: Vec<Option<TrackTime>> = (0..count).map(|i| Some(addr(SECTOR_START + i))).collect();
    assert_eq!(absolute, expected);

    let mut image = Vec::new();
    for index in SECTOR_START..SECTOR_START + count {
        image.extend_from_slice(&build_sector(index));
    }
    assert_eq!(compute_slice_hash(&decoded.image()), compute_slice_hash(&image));
}

#[test]
fn test_f1_round_trip() {
    init();
    let mut rng = StdRng::seed_from_u64(0xEF);
    let input: Vec<[u8; F1_FRAME_BYTES]> = (0..300).map(|_| rng.gen()).collect();

    let mut encoder = ChannelEncoder::new();
    for frame in input.iter() {
        encoder.push_f1(frame);
    }
    let decoded = decode_channel(&modulate(encoder.frames()));

    assert_eq!(decoded.f1.len(), 300 - 2);
    for (k, frame) in decoded.f1.iter().take(300 - 110).enumerate() {
        assert!(!frame.has_errors(), "frame {} flagged", k);
        assert_eq!(frame.data, input[k], "frame {} differs", k);
    }
}

#[test]
fn test_sector_f1_frames_match_tap() {
    init();
    let frames = synth_frames(SECTOR_START, 1);
    let decoded = decode_frames(&frames);

    let expected = sector_f1_frames(&build_sector(SECTOR_START));
    let tapped: Vec<[u8; F1_FRAME_BYTES]> = decoded
        .f1
        .iter()
        .skip(LEAD_FRAMES)
        .take(FRAMES_PER_SECTOR)
        .map(|f| f.data)
        .collect();
    assert_eq!(tapped, expected);
}

#[test]
fn test_cancel_flushes_circ_delays() {
    init();
    let frames = synth_frames(SECTOR_START, 1);
    let mut decoder = EfmDecoder::new(DecodeOptions::default());
    let cancel = decoder.cancel_handle();

    // Stop a few frames short of the end of the padding. The sector's last F1 frames are then
    // still inside the CIRC delays.
    let stop = frames.len() - 5;
    for frame in frames[..stop].iter() {
        decoder.push_f3(frame.clone()).unwrap();
    }
    assert!(!decoder
        .drain_events()
        .iter()
        .any(|e| matches!(e, DecodeEvent::Sector(..))));

    cancel.store(true, std::sync::atomic::Ordering::Relaxed);
    let result = decoder.push_f3(frames[stop].clone());
    assert!(matches!(result, Err(EfmError::Cancelled)));

    let events = decoder.drain_events();
    assert!(matches!(events.last(), Some(DecodeEvent::Cancelled)));
    let sectors: Vec<&Sector> = events
        .iter()
        .filter_map(|e| match e {
            DecodeEvent::Sector(sector, _) => Some(sector),
            _ => None,
        })
        .collect();
    assert_eq!(sectors.len(), 1);
    assert_eq!(sectors[0].address, Some(addr(SECTOR_START)));
    assert!(!sectors[0].status.is_bad());
    assert_eq!(sectors[0].user_data(), &user_pattern()[..]);
    assert!(decoder.report().cancelled);
}
