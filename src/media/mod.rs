//! Best-effort probing of video display dimensions.
//!
//! Reads the track headers of ISO base media files (MP4, MOV, M4V, 3GP). Other
//! containers and malformed input yield `None`; callers treat that as
//! landscape.

/// Display size of the first visual track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

/// Find the display dimensions of the first track that has any.
///
/// A 90 or 270 degree rotation in the track matrix swaps width and height, as
/// players do when presenting the frame.
pub fn probe_dimensions(data: &[u8]) -> Option<Dimensions> {
    let moov = boxes(data).find(|(kind, _)| kind == b"moov")?.1;

    boxes(moov)
        .filter(|(kind, _)| kind == b"trak")
        .filter_map(|(_, trak)| boxes(trak).find(|(kind, _)| kind == b"tkhd"))
        .filter_map(|(_, tkhd)| track_header_dimensions(tkhd))
        .find(|d| d.width > 0 && d.height > 0)
}

fn track_header_dimensions(tkhd: &[u8]) -> Option<Dimensions> {
    let version = *tkhd.first()?;
    // version/flags, then times, track id and duration
    let matrix_at = match version {
        0 => 4 + 20 + 16,
        1 => 4 + 32 + 16,
        _ => return None,
    };
    let size_at = matrix_at + 36;

    let a = read_u32(tkhd, matrix_at)?;
    let d = read_u32(tkhd, matrix_at + 16)?;
    // 16.16 fixed point
    let width = read_u32(tkhd, size_at)? >> 16;
    let height = read_u32(tkhd, size_at + 4)? >> 16;

    if a == 0 && d == 0 {
        Some(Dimensions {
            width: height,
            height: width,
        })
    } else {
        Some(Dimensions { width, height })
    }
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes(bytes.try_into().ok()?))
}

fn read_u64(data: &[u8], at: usize) -> Option<u64> {
    let bytes = data.get(at..at.checked_add(8)?)?;
    Some(u64::from_be_bytes(bytes.try_into().ok()?))
}

/// Iterate `(type, body)` pairs of consecutive boxes. Stops at the first
/// truncated or malformed header.
fn boxes(data: &[u8]) -> impl Iterator<Item = ([u8; 4], &[u8])> {
    let mut offset = 0usize;
    std::iter::from_fn(move || {
        let size = read_u32(data, offset)? as u64;
        let kind: [u8; 4] = data.get(offset + 4..offset + 8)?.try_into().ok()?;

        let (header, total) = match size {
            0 => (8, (data.len() - offset) as u64),
            1 => (16, read_u64(data, offset + 8)?),
            n => (8, n),
        };
        if total < header as u64 {
            return None;
        }

        let end = offset.checked_add(usize::try_from(total).ok()?)?;
        let body = data.get(offset + header..end)?;
        offset = end;
        Some((kind, body))
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const IDENTITY: [u32; 9] = [0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000];

    pub fn mp4_box(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
        out.extend_from_slice(kind);
        out.extend_from_slice(body);
        out
    }

    pub fn tkhd(width: u32, height: u32, matrix: [u32; 9]) -> Vec<u8> {
        let mut body = vec![0u8; 4 + 20 + 16];
        for value in matrix {
            body.extend_from_slice(&value.to_be_bytes());
        }
        body.extend_from_slice(&(width << 16).to_be_bytes());
        body.extend_from_slice(&(height << 16).to_be_bytes());
        mp4_box(b"tkhd", &body)
    }

    pub fn movie(tracks: &[Vec<u8>]) -> Vec<u8> {
        let traks: Vec<u8> = tracks
            .iter()
            .flat_map(|t| mp4_box(b"trak", t))
            .collect();
        let mut file = mp4_box(b"ftyp", b"isom\0\0\0\0");
        file.extend(mp4_box(b"mdat", &[1, 2, 3, 4]));
        file.extend(mp4_box(b"moov", &traks));
        file
    }

    /// Single-track movie of the given size.
    pub fn sample_movie(width: u32, height: u32) -> Vec<u8> {
        movie(&[tkhd(width, height, IDENTITY)])
    }
}
