//! Parser for cd-hit `.clstr` cluster reports
//!
//! ```text
//! >Cluster 0
//! 0	253nt, >asv_0... *
//! 1	253nt, >asv_5... at +/100.00%
//! >Cluster 1
//! 0	252nt, >asv_1... *
//! ```

use crate::core::clusters::ClusterMap;
use crate::{CollapseError, Result};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::{alpha1, digit1, one_of, space0, space1},
    combinator::{map, map_res, opt, value},
    number::complete::double,
    sequence::{pair, terminated, tuple},
    IResult,
};
use std::io::BufRead;

/// How a member relates to its cluster representative
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Membership {
    Representative,
    Identity(f64),
}

/// One member line of a cluster report
#[derive(Debug, Clone, PartialEq)]
pub struct ClstrMember<'a> {
    pub length: usize,
    pub id: &'a str,
    pub membership: Membership,
}

/// Parse a `>Cluster N` header, returning N
fn parse_cluster_header(input: &str) -> IResult<&str, usize> {
    let (input, _) = tag(">Cluster")(input)?;
    let (input, _) = space1(input)?;
    map_res(digit1, str::parse::<usize>)(input)
}

/// Parse the `at +/100.00%` part of a member line
fn parse_identity(input: &str) -> IResult<&str, f64> {
    let (input, _) = tag("at")(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = opt(pair(one_of("+-"), tag("/")))(input)?;
    terminated(double, tag("%"))(input)
}

/// Parse a member line
fn parse_member(input: &str) -> IResult<&str, ClstrMember<'_>> {
    let (input, (_, _, length, _, _, _)) = tuple((
        digit1,
        space1,
        map_res(digit1, str::parse::<usize>),
        alpha1,
        tag(","),
        space0,
    ))(input)?;
    let (input, _) = tag(">")(input)?;
    let (input, id) = take_until("...")(input)?;
    let (input, _) = tag("...")(input)?;
    let (input, _) = space1(input)?;
    let (input, membership) = alt((
        value(Membership::Representative, tag("*")),
        map(parse_identity, Membership::Identity),
    ))(input)?;

    Ok((input, ClstrMember { length, id, membership }))
}

/// Read a cluster report into raw cluster membership
///
/// Cluster ids are `cluster_N` after the report's own numbering; members keep
/// report order and the identifiers exactly as printed by cd-hit.
pub fn parse_clstr<R: BufRead>(reader: R) -> Result<ClusterMap> {
    let mut clusters = ClusterMap::new();
    let mut current: Option<String> = None;

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('>') {
            let (_, number) = parse_cluster_header(trimmed).map_err(|_| malformed(n, trimmed))?;
            let cluster = format!("cluster_{}", number);
            clusters.insert(cluster.clone(), Vec::new());
            current = Some(cluster);
            continue;
        }

        let (_, member) = parse_member(trimmed).map_err(|_| malformed(n, trimmed))?;
        let cluster = current.as_deref().ok_or_else(|| malformed(n, trimmed))?;
        if let Membership::Identity(pct) = member.membership {
            if pct < 100.0 {
                tracing::warn!(
                    "{} joined {} at {:.2}% identity, below exact match",
                    member.id,
                    cluster,
                    pct
                );
            }
        }
        clusters.push_member(cluster, member.id.to_string());
    }

    Ok(clusters)
}

fn malformed(index: usize, line: &str) -> CollapseError {
    CollapseError::ClusteringFailed(format!(
        "unreadable cluster report at line {}: '{}'",
        index + 1,
        line
    ))
}
