//! Multi-member container codec.
//!
//! A container interleaves member data across chunks. The footer holds one
//! signed delta per (chunk, member) pair followed by the chunk count; the
//! running chunk size accumulates the deltas within each chunk, and member
//! totals accumulate across chunks.

use byteorder::{BigEndian, ByteOrder};
use tracing::trace;

use crate::error::{Error, Result};

/// Split a container into its member buffers.
///
/// `member_count` comes from the reference-table entry for the archive.
pub fn decode(buf: &[u8], member_count: usize) -> Result<Vec<Vec<u8>>> {
    if member_count == 0 {
        return Err(Error::EmptyContainer);
    }
    if buf.is_empty() {
        return Err(Error::TruncatedData {
            expected: 1,
            actual: 0,
        });
    }

    let chunks = buf[buf.len() - 1] as usize;
    let footer = 1 + chunks * member_count * 4;
    if footer > buf.len() {
        return Err(Error::FooterOverrun {
            footer,
            len: buf.len(),
        });
    }
    let data_len = buf.len() - footer;
    trace!("container: {chunks} chunks x {member_count} members, {data_len} data bytes");

    let mut chunk_sizes = vec![vec![0i32; member_count]; chunks];
    let mut sizes = vec![0i32; member_count];
    let mut pos = data_len;
    for chunk in 0..chunks {
        let mut chunk_size = 0i32;
        for member in 0..member_count {
            let delta = BigEndian::read_i32(&buf[pos..]);
            pos += 4;
            chunk_size = chunk_size.wrapping_add(delta);
            chunk_sizes[chunk][member] = chunk_size;
            sizes[member] = sizes[member].wrapping_add(chunk_size);
        }
    }

    let mut members: Vec<Vec<u8>> = sizes
        .iter()
        .map(|&size| Vec::with_capacity(size.max(0) as usize))
        .collect();

    let mut pos = 0;
    for chunk in 0..chunks {
        for (member, out) in members.iter_mut().enumerate() {
            let len = chunk_sizes[chunk][member];
            if len < 0 || pos + len as usize > data_len {
                return Err(Error::TruncatedData {
                    expected: pos.wrapping_add(len as usize),
                    actual: data_len,
                });
            }
            out.extend_from_slice(&buf[pos..pos + len as usize]);
            pos += len as usize;
        }
    }
    Ok(members)
}

/// Join member buffers into a single-chunk container.
pub fn encode(members: &[Vec<u8>]) -> Result<Vec<u8>> {
    if members.is_empty() {
        return Err(Error::EmptyContainer);
    }

    let data_len: usize = members.iter().map(Vec::len).sum();
    let mut buf = Vec::with_capacity(data_len + members.len() * 4 + 1);
    for member in members {
        buf.extend_from_slice(member);
    }

    let mut prev = 0i32;
    for member in members {
        let len = member.len() as i32;
        let mut delta = [0u8; 4];
        BigEndian::write_i32(&mut delta, len.wrapping_sub(prev));
        buf.extend_from_slice(&delta);
        prev = len;
    }

    buf.push(1);
    Ok(buf)
}
