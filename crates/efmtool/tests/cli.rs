use efmfox::{
    encoder::{framed_records, modulate, ChannelEncoder, SectorBuilder},
    QChannel,
    TrackTime,
    SECTOR_SIZE,
};
use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

fn encoder_for(first: u32, count: u32) -> ChannelEncoder {
    let mut encoder = ChannelEncoder::new();
    encoder.push_padding(4);
    for index in first..first + count {
        let user: Vec<u8> = (0..2048u32).map(|i| (i ^ index) as u8).collect();
        let sector = SectorBuilder::new(TrackTime::from_index(index)).build(&user).unwrap();
        let q = QChannel::position(4, 1, 1, TrackTime::from_index(index - 150), TrackTime::from_index(index));
        encoder.push_sector(&sector, Some(&q));
    }
    encoder.flush();
    encoder
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn efmtool(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_efmtool"))
        .args(args)
        .output()
        .expect("Failed to run efmtool")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_decode_channel_bits() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "capture.efm", &modulate(encoder_for(150, 3).frames()));
    let image = dir.path().join("out.img");
    let meta = dir.path().join("out.meta");
    let qlog = dir.path().join("out.qlog");

    let output = efmtool(&[
        "--silent",
        "-o",
        path_arg(&image),
        "--meta",
        path_arg(&meta),
        "--qlog",
        path_arg(&qlog),
        path_arg(&input),
    ]);
    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));

    assert_eq!(fs::read(&image).unwrap().len(), 3 * SECTOR_SIZE);

    let meta = fs::read_to_string(&meta).unwrap();
    let lines: Vec<&str> = meta.lines().collect();
    assert!(lines[0].starts_with("00:02:00,1,ok,"));
    assert!(lines[1].starts_with("00:02:01,1,ok,"));
    assert!(lines[2].starts_with("00:02:02,1,ok,"));

    let qlog = fs::read_to_string(&qlog).unwrap();
    assert_eq!(qlog.lines().count(), 3);
    assert!(qlog.lines().all(|l| l.ends_with(",ok")));
}

#[test]
fn test_decode_framed_segments() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_file(
        dir.path(),
        "a.f3",
        &framed_records(encoder_for(150, 2).frames()).unwrap(),
    );
    let second = write_file(
        dir.path(),
        "b.f3",
        &framed_records(encoder_for(160, 1).frames()).unwrap(),
    );
    let image = dir.path().join("out.img");

    let output = efmtool(&[
        "--framed",
        "-o",
        path_arg(&image),
        path_arg(&first),
        path_arg(&second),
    ]);
    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));

    let image = fs::read(&image).unwrap();
    assert_eq!(image.len(), 3 * SECTOR_SIZE);
    // Segments are written in input order.
    assert_eq!(&image[2 * SECTOR_SIZE + 12..2 * SECTOR_SIZE + 15], &[0x00, 0x02, 0x10]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Segment 0:"));
    assert!(stdout.contains("Segment 1:"));
}

#[test]
fn test_never_synchronised() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "blank.efm", &[0u8; 8192]);

    let output = efmtool(&["--silent", path_arg(&input)]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_max_bad_exceeded() {
    let dir = tempfile::tempdir().unwrap();
    let mut frames = encoder_for(150, 3).into_frames();
    frames.truncate(250);
    let input = write_file(dir.path(), "short.efm", &modulate(&frames));
    let bad_list = dir.path().join("bad.txt");

    let output = efmtool(&[
        "--silent",
        "--max-bad",
        "0",
        "--bad-list",
        path_arg(&bad_list),
        path_arg(&input),
    ]);
    assert_eq!(output.status.code(), Some(2));

    let bad: Vec<u32> = fs::read_to_string(&bad_list)
        .unwrap()
        .lines()
        .map(|l| l.parse().unwrap())
        .collect();
    assert_eq!(bad, vec![151, 152]);
}

#[test]
fn test_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.efm");

    let output = efmtool(&["--silent", path_arg(&missing)]);
    assert_eq!(output.status.code(), Some(3));
}
