use nom::branch::alt;
use nom::character::complete::{char, space1};
use nom::combinator::{map, value};
use nom::sequence::{pair, preceded, terminated};
use nom::{IResult, Parser};

use super::ast::RelationKind;

fn relation_kind(input: &str) -> IResult<&str, RelationKind> {
    alt((
        value(RelationKind::BelongsTo, char('-')),
        value(RelationKind::HasMany, char('<')),
        value(RelationKind::ManyToMany, char('x')),
    ))
    .parse(input)
}

/// Parse the relation marker at the start of a trimmed spec line:
/// `p <kind> ` marks a polymorphic relation, a bare kind marker a plain one.
/// The remaining input is the alias text.
pub(crate) fn parse_marker(input: &str) -> IResult<&str, (RelationKind, bool)> {
    alt((
        map(
            preceded(pair(char('p'), space1), terminated(relation_kind, space1)),
            |kind| (kind, true),
        ),
        map(terminated(relation_kind, space1), |kind| (kind, false)),
    ))
    .parse(input)
}
