use std::cmp::Ordering;

use asl_stream::StreamState;

/// Which of two logs for the same stream is canonical.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogChoice {
    Local,
    Remote,
}

/// Choose between the local log and a remote one.
///
/// A log that extends the other wins outright. Otherwise the log with more
/// anchor commits wins, then the one whose latest anchor has the smaller
/// block number (it was anchored first). A complete tie keeps the local log.
pub fn select_log(local: &StreamState, remote: &StreamState) -> LogChoice {
    if is_prefix(remote, local) {
        return LogChoice::Local;
    }
    if is_prefix(local, remote) {
        return LogChoice::Remote;
    }

    match local.anchor_count().cmp(&remote.anchor_count()) {
        Ordering::Greater => return LogChoice::Local,
        Ordering::Less => return LogChoice::Remote,
        Ordering::Equal => {}
    }

    let local_block = local.latest_anchor().map(|p| p.block_number);
    let remote_block = remote.latest_anchor().map(|p| p.block_number);
    match (local_block, remote_block) {
        (Some(l), Some(r)) if r < l => LogChoice::Remote,
        _ => LogChoice::Local,
    }
}

fn is_prefix(short: &StreamState, long: &StreamState) -> bool {
    short.len() <= long.len()
        && short
            .log()
            .iter()
            .zip(long.log())
            .all(|(a, b)| a.cid == b.cid)
}
