//! nom grammar for capture filters.
//!
//! ```text
//! disjunction = conjunction ( ("or" | "||") conjunction )*
//! conjunction = unary ( ("and" | "&&") unary )*
//! unary       = ("not" | "!") unary | "(" disjunction ")" | primitive
//! primitive   = "proto" N
//!             | [src|dst] [tcp|udp] ("host" A | "net" A/P | "port" N | "portrange" N-N)
//!             | tcp | udp | icmp | arp | ip
//! ```
//!
//! Keywords are case-insensitive. A transport qualifier is only accepted in
//! front of `port` and `portrange`.

use std::net::Ipv4Addr;

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{all_consuming, map, map_res, opt, recognize, value, verify},
    error::{Error as NomError, ErrorKind},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated},
    IResult,
};

use super::ast::{Cidr, Direction, FilterExpr, Primitive, Protocol};
use crate::error::FilterError;

/// Parse a complete filter expression.
pub fn parse_filter(input: &str) -> Result<FilterExpr, FilterError> {
    if input.trim().is_empty() {
        return Err(FilterError::EmptyFilter);
    }

    all_consuming(delimited(multispace0, disjunction, multispace0))(input)
        .map(|(_, expr)| expr)
        .map_err(|e| FilterError::parse_error(e.to_string()))
}

/// A binary operator: a word that needs trailing space, or a symbol that doesn't.
fn operator<'a>(word: &'static str, symbol: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    preceded(
        multispace0,
        alt((
            terminated(tag_no_case(word), multispace1),
            terminated(tag(symbol), multispace0),
        )),
    )
}

fn disjunction(input: &str) -> IResult<&str, FilterExpr> {
    let (input, head) = conjunction(input)?;
    let (input, tail) = many0(preceded(operator("or", "||"), conjunction))(input)?;
    Ok((input, tail.into_iter().fold(head, FilterExpr::or)))
}

fn conjunction(input: &str) -> IResult<&str, FilterExpr> {
    let (input, head) = unary(input)?;
    let (input, tail) = many0(preceded(operator("and", "&&"), unary))(input)?;
    Ok((input, tail.into_iter().fold(head, FilterExpr::and)))
}

fn unary(input: &str) -> IResult<&str, FilterExpr> {
    alt((
        map(preceded(operator("not", "!"), unary), FilterExpr::not),
        delimited(pair(char('('), multispace0), disjunction, pair(multispace0, char(')'))),
        map(primitive, FilterExpr::Primitive),
    ))(input)
}

fn primitive(input: &str) -> IResult<&str, Primitive> {
    alt((
        map(
            preceded(pair(tag_no_case("proto"), multispace1), map_res(digit1, str::parse)),
            Primitive::Proto,
        ),
        qualified,
        map(protocol, Primitive::Protocol),
    ))(input)
}

#[derive(Clone, Copy)]
enum Keyword {
    Host,
    Net,
    Port,
    PortRange,
}

/// `[src|dst] [tcp|udp] keyword argument`.
fn qualified(input: &str) -> IResult<&str, Primitive> {
    let (input, direction) = opt(terminated(direction, multispace1))(input)?;
    let direction = direction.unwrap_or_default();
    let (input, transport) = opt(terminated(transport, multispace1))(input)?;
    let (input, keyword) = terminated(
        alt((
            value(Keyword::PortRange, tag_no_case("portrange")),
            value(Keyword::Port, tag_no_case("port")),
            value(Keyword::Host, tag_no_case("host")),
            value(Keyword::Net, tag_no_case("net")),
        )),
        multispace1,
    )(input)?;

    match (keyword, transport) {
        (Keyword::Host, None) => map(ipv4, |address| Primitive::Host { direction, address })(input),
        (Keyword::Net, None) => map(cidr, |cidr| Primitive::Net { direction, cidr })(input),
        (Keyword::Port, protocol) => map(port, |port| Primitive::Port {
            direction,
            protocol,
            port,
        })(input),
        (Keyword::PortRange, protocol) => map(separated_pair(port, char('-'), port), |(start, end)| {
            Primitive::PortRange {
                direction,
                protocol,
                start,
                end,
            }
        })(input),
        _ => Err(nom::Err::Error(NomError::new(input, ErrorKind::Verify))),
    }
}

fn direction(input: &str) -> IResult<&str, Direction> {
    alt((
        value(Direction::Src, tag_no_case("src")),
        value(Direction::Dst, tag_no_case("dst")),
    ))(input)
}

fn transport(input: &str) -> IResult<&str, Protocol> {
    verify(protocol, Protocol::has_ports)(input)
}

fn protocol(input: &str) -> IResult<&str, Protocol> {
    alt((
        value(Protocol::Tcp, tag_no_case("tcp")),
        value(Protocol::Udp, tag_no_case("udp")),
        value(Protocol::Icmp, tag_no_case("icmp")),
        value(Protocol::Arp, tag_no_case("arp")),
        value(Protocol::Ip, tag_no_case("ip")),
    ))(input)
}

fn ipv4(input: &str) -> IResult<&str, Ipv4Addr> {
    map_res(recognize(separated_list1(char('.'), digit1)), str::parse)(input)
}

fn cidr(input: &str) -> IResult<&str, Cidr> {
    map(
        separated_pair(ipv4, char('/'), verify(map_res(digit1, str::parse::<u8>), |len: &u8| *len <= 32)),
        |(address, prefix_len)| Cidr { address, prefix_len },
    )(input)
}

fn port(input: &str) -> IResult<&str, u16> {
    map_res(digit1, str::parse)(input)
}
