//! Minimal MP4 files for CLI tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

fn boxed(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(name);
    out.extend_from_slice(payload);
    out
}

fn full_box(name: &[u8; 4], flags: u32, body: &[u8]) -> Vec<u8> {
    let mut payload = flags.to_be_bytes().to_vec();
    payload.extend_from_slice(body);
    boxed(name, &payload)
}

fn be32(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

/// SPS + PPS, then an IDR slice.
pub const SAMPLES: [&[u8]; 2] = [
    &[0, 0, 0, 2, 0x67, 0x42, 0, 0, 0, 1, 0x68],
    &[0, 0, 0, 3, 0x65, 0x88, 0x84],
];

pub const STREAM: &[u8] = &[
    0, 0, 0, 1, 0x67, 0x42, 0, 0, 0, 1, 0x68, 0, 0, 0, 1, 0x65, 0x88, 0x84,
];

/// Build a single-track video file. With `broken`, the second sample
/// declares a NAL unit longer than the sample.
pub fn video_mp4(broken: bool) -> Vec<u8> {
    let mut samples: Vec<Vec<u8>> = SAMPLES.iter().map(|s| s.to_vec()).collect();
    if broken {
        samples[1][3] = 9;
    }

    let ftyp = boxed(b"ftyp", &[b"isom".as_slice(), &[0, 0, 2, 0], b"isom", b"avc1"].concat());
    let payload = samples.concat();
    let mdat = boxed(b"mdat", &payload);
    let chunk_offset = (ftyp.len() + 8) as u32;

    let mut mvhd = vec![0u8; 96];
    mvhd[8..16].copy_from_slice(&be32(&[1000, 2000]));
    mvhd[16..20].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    mvhd[20..22].copy_from_slice(&0x0100u16.to_be_bytes());
    mvhd[92..96].copy_from_slice(&2u32.to_be_bytes());

    let mut tkhd = vec![0u8; 80];
    tkhd[8..12].copy_from_slice(&1u32.to_be_bytes());
    tkhd[72..80].copy_from_slice(&be32(&[320 << 16, 240 << 16]));

    let mut mdhd = vec![0u8; 20];
    mdhd[8..16].copy_from_slice(&be32(&[90000, 180000]));
    mdhd[16..18].copy_from_slice(&0x15c7u16.to_be_bytes());

    let mut hdlr = vec![0u8; 20];
    hdlr[4..8].copy_from_slice(b"vide");
    hdlr.extend_from_slice(b"VideoHandler\0");

    let sizes: Vec<u32> = samples.iter().map(|s| s.len() as u32).collect();
    let stbl = [
        full_box(b"stsz", 0, &[be32(&[0, 2]), be32(&sizes)].concat()),
        full_box(b"stsc", 0, &be32(&[1, 1, 2, 1])),
        full_box(b"stco", 0, &be32(&[1, chunk_offset])),
    ]
    .concat();
    let minf = [full_box(b"vmhd", 1, &[0; 8]), boxed(b"stbl", &stbl)].concat();
    let mdia = [
        full_box(b"mdhd", 0, &mdhd),
        full_box(b"hdlr", 0, &hdlr),
        boxed(b"minf", &minf),
    ]
    .concat();
    let trak = [full_box(b"tkhd", 3, &tkhd), boxed(b"mdia", &mdia)].concat();
    let moov = [full_box(b"mvhd", 0, &mvhd), boxed(b"trak", &trak)].concat();

    [ftyp, mdat, boxed(b"moov", &moov)].concat()
}

/// Write [`video_mp4`] into `dir` and return its path.
pub fn write_video_mp4(dir: &Path, broken: bool) -> PathBuf {
    let path = dir.join(if broken { "broken.mp4" } else { "video.mp4" });
    std::fs::write(&path, video_mp4(broken)).unwrap();
    path
}
