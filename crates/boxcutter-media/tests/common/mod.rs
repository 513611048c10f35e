//! Synthetic MP4 files for integration tests.

#![allow(dead_code)]

pub fn boxed(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 8);
    out.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
    out.extend_from_slice(name);
    out.extend_from_slice(payload);
    out
}

pub fn full_box(name: &[u8; 4], version: u8, flags: u32, body: &[u8]) -> Vec<u8> {
    let mut payload = (((version as u32) << 24) | flags).to_be_bytes().to_vec();
    payload.extend_from_slice(body);
    boxed(name, &payload)
}

pub fn ftyp() -> Vec<u8> {
    boxed(b"ftyp", &[b"isom".as_slice(), &512u32.to_be_bytes(), b"isom", b"iso2"].concat())
}

/// Version 0 mvhd: timescale 1000, duration 3000, next track 3.
pub fn mvhd() -> Vec<u8> {
    let mut body = vec![0u8; 96];
    body[8..12].copy_from_slice(&1000u32.to_be_bytes());
    body[12..16].copy_from_slice(&3000u32.to_be_bytes());
    body[16..20].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    body[20..22].copy_from_slice(&0x0100u16.to_be_bytes());
    body[92..96].copy_from_slice(&3u32.to_be_bytes());
    full_box(b"mvhd", 0, 0, &body)
}

/// Version 0 tkhd with a 640x360 presentation size.
pub fn tkhd(track_id: u32) -> Vec<u8> {
    let mut body = vec![0u8; 80];
    body[8..12].copy_from_slice(&track_id.to_be_bytes());
    body[72..76].copy_from_slice(&(640u32 << 16).to_be_bytes());
    body[76..80].copy_from_slice(&(360u32 << 16).to_be_bytes());
    full_box(b"tkhd", 0, 3, &body)
}

pub fn mdhd() -> Vec<u8> {
    let mut body = vec![0u8; 20];
    body[8..12].copy_from_slice(&90000u32.to_be_bytes());
    body[12..16].copy_from_slice(&270000u32.to_be_bytes());
    body[16..18].copy_from_slice(&0x15c7u16.to_be_bytes());
    full_box(b"mdhd", 0, 0, &body)
}

pub fn hdlr(handler: &[u8; 4], name: &str) -> Vec<u8> {
    let mut body = vec![0u8; 20];
    body[4..8].copy_from_slice(handler);
    body.extend_from_slice(name.as_bytes());
    body.push(0);
    full_box(b"hdlr", 0, 0, &body)
}

/// One track of a synthetic file.
#[derive(Debug, Clone)]
pub struct Track {
    pub handler: [u8; 4],
    pub track_id: u32,
    /// Length-prefixed sample payloads, stored contiguously in mdat.
    pub samples: Vec<Vec<u8>>,
    /// Number of samples in each chunk.
    pub chunks: Vec<u32>,
    /// Store chunk offsets in co64 instead of stco.
    pub wide: bool,
    /// Replace the computed chunk offsets.
    pub offsets_override: Option<Vec<u64>>,
    /// Leave this child out of stbl.
    pub omit: Option<[u8; 4]>,
}

impl Track {
    pub fn new(handler: &[u8; 4], track_id: u32, samples: Vec<Vec<u8>>, chunks: Vec<u32>) -> Self {
        Self {
            handler: *handler,
            track_id,
            samples,
            chunks,
            wide: false,
            offsets_override: None,
            omit: None,
        }
    }

    fn trak(&self, data_start: u64) -> Vec<u8> {
        let mut sample_offsets = Vec::with_capacity(self.samples.len());
        let mut pos = data_start;
        for sample in &self.samples {
            sample_offsets.push(pos);
            pos += sample.len() as u64;
        }

        let mut chunk_offsets = Vec::new();
        let mut stsc_entries: Vec<(u32, u32)> = Vec::new();
        let mut first_sample = 0usize;
        for (i, &count) in self.chunks.iter().enumerate() {
            chunk_offsets.push(sample_offsets.get(first_sample).copied().unwrap_or(pos));
            if stsc_entries.last().map(|e| e.1) != Some(count) {
                stsc_entries.push((i as u32 + 1, count));
            }
            first_sample += count as usize;
        }
        let chunk_offsets = self.offsets_override.clone().unwrap_or(chunk_offsets);

        let mut stsz = Vec::new();
        stsz.extend_from_slice(&0u32.to_be_bytes());
        stsz.extend_from_slice(&(self.samples.len() as u32).to_be_bytes());
        for sample in &self.samples {
            stsz.extend_from_slice(&(sample.len() as u32).to_be_bytes());
        }

        let mut stsc = (stsc_entries.len() as u32).to_be_bytes().to_vec();
        for (first_chunk, per_chunk) in &stsc_entries {
            stsc.extend_from_slice(&first_chunk.to_be_bytes());
            stsc.extend_from_slice(&per_chunk.to_be_bytes());
            stsc.extend_from_slice(&1u32.to_be_bytes());
        }

        let mut stco = (chunk_offsets.len() as u32).to_be_bytes().to_vec();
        for offset in &chunk_offsets {
            if self.wide {
                stco.extend_from_slice(&offset.to_be_bytes());
            } else {
                stco.extend_from_slice(&(*offset as u32).to_be_bytes());
            }
        }
        let offsets_name = if self.wide { b"co64" } else { b"stco" };

        let mut stbl = Vec::new();
        for (name, body) in [(b"stsz", stsz), (b"stsc", stsc), (offsets_name, stco)] {
            if self.omit != Some(*name) {
                stbl.extend_from_slice(&full_box(name, 0, 0, &body));
            }
        }

        let media_header = if &self.handler == b"vide" {
            full_box(b"vmhd", 0, 1, &[0; 8])
        } else {
            full_box(b"smhd", 0, 0, &[0; 4])
        };
        let minf = boxed(b"minf", &[media_header, boxed(b"stbl", &stbl)].concat());
        let mdia = boxed(b"mdia", &[mdhd(), hdlr(&self.handler, "Handler"), minf].concat());
        boxed(b"trak", &[tkhd(self.track_id), mdia].concat())
    }
}

/// Lay out `ftyp`, `mdat` (every track's samples, in track order) and
/// `moov`, in that order.
pub fn build_file(tracks: &[Track], extended_mdat: bool) -> Vec<u8> {
    let ftyp = ftyp();
    let payload: Vec<u8> = tracks
        .iter()
        .flat_map(|t| t.samples.iter().flatten().copied())
        .collect();

    let mdat = if extended_mdat {
        let mut mdat = 1u32.to_be_bytes().to_vec();
        mdat.extend_from_slice(b"mdat");
        mdat.extend_from_slice(&(payload.len() as u64 + 16).to_be_bytes());
        mdat.extend_from_slice(&payload);
        mdat
    } else {
        boxed(b"mdat", &payload)
    };

    let mut data_start = (ftyp.len() + mdat.len() - payload.len()) as u64;
    let mut moov = mvhd();
    for track in tracks {
        moov.extend_from_slice(&track.trak(data_start));
        data_start += track.samples.iter().map(|s| s.len() as u64).sum::<u64>();
    }

    [ftyp, mdat, boxed(b"moov", &moov)].concat()
}

pub fn audio_track() -> Track {
    Track::new(b"soun", 1, vec![vec![0xff, 0xf1, 0x50, 0x80]], vec![1])
}

/// Three samples in two chunks: SPS+PPS, an IDR slice, a P slice.
pub fn video_track() -> Track {
    Track::new(
        b"vide",
        2,
        vec![
            vec![0, 0, 0, 2, 0x67, 0x42, 0, 0, 0, 1, 0x68],
            vec![0, 0, 0, 3, 0x65, 0x88, 0x84],
            vec![0, 0, 0, 2, 0x41, 0x9a],
        ],
        vec![2, 1],
    )
}

/// The Annex-B form of [`video_track`].
pub const VIDEO_STREAM: &[u8] = &[
    0, 0, 0, 1, 0x67, 0x42, 0, 0, 0, 1, 0x68, 0, 0, 0, 1, 0x65, 0x88, 0x84, 0, 0, 0, 1, 0x41,
    0x9a,
];

/// Audio track followed by the video track.
pub fn sample_file() -> Vec<u8> {
    build_file(&[audio_track(), video_track()], false)
}
