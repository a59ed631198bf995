use std::path::PathBuf;
use std::str::FromStr;

use super::*;
use chumsky::{error::SimpleReason, prelude::*, text::whitespace};
use itertools::Itertools;

#[derive(Debug, Snafu)]
#[snafu(display("cannot parse '{input}' - {}", self.combine_errors("\n")))]
pub struct ParseError {
    input: String,
    errors: Vec<Simple<char>>,
}

impl ParseError {
    fn combine_errors(&self, separator: &str) -> String {
        self.errors
            .iter()
            .map(|err| {
                format!(
                    "{}:\n   {}",
                    err,
                    match err.reason() {
                        SimpleReason::Custom(msg) => format!("error {}", msg),
                        SimpleReason::Unexpected => "unexpected input".to_string(),
                        SimpleReason::Unclosed { span, delimiter } => {
                            format!(
                                "unclosed delimiter ({}..{}) in {}",
                                span.start, span.end, delimiter
                            )
                        }
                    }
                )
            })
            .join(separator)
    }
}

pub fn parse(input: &str) -> Result<Action, ParseError> {
    program().parse(input).map_err(|errors| ParseError {
        input: input.to_string(),
        errors,
    })
}

fn program() -> impl Parser<char, Action, Error = Simple<char>> {
    choice((
        action_course(),
        action_list(),
        action_tick(),
        action_end(),
        action_toggle(),
        action_progress(),
        action_move(),
        action_status(),
        action_delete(),
        action_members(),
        action_upload(),
        action_exit(),
    ))
    .or(end().to(Action::None))
    .padded()
    .then_ignore(end())
}

fn keyword(word: &'static str) -> impl Parser<char, (), Error = Simple<char>> {
    just(word).then_ignore(whitespace().at_least(1)).ignored()
}

fn action_course() -> impl Parser<char, Action, Error = Simple<char>> {
    keyword("course")
        .ignore_then(number::<CourseId>("course id"))
        .map(|course| Action::Course { course })
}

fn action_list() -> impl Parser<char, Action, Error = Simple<char>> {
    just("list").to(Action::List)
}

fn action_tick() -> impl Parser<char, Action, Error = Simple<char>> {
    keyword("tick")
        .ignore_then(number::<ContentId>("content id"))
        .then_ignore(whitespace().at_least(1))
        .then(seconds())
        .then_ignore(whitespace().at_least(1))
        .then(seconds())
        .map(|((content, current_time), duration)| Action::Tick {
            content,
            current_time,
            duration,
        })
}

fn action_end() -> impl Parser<char, Action, Error = Simple<char>> {
    keyword("end")
        .ignore_then(number::<ContentId>("content id"))
        .map(|content| Action::End { content })
}

fn action_toggle() -> impl Parser<char, Action, Error = Simple<char>> {
    keyword("toggle")
        .ignore_then(number::<ContentId>("content id"))
        .map(|content| Action::Toggle { content })
}

fn action_progress() -> impl Parser<char, Action, Error = Simple<char>> {
    keyword("progress")
        .ignore_then(number::<ContentId>("content id"))
        .map(|content| Action::Progress { content })
}

fn action_move() -> impl Parser<char, Action, Error = Simple<char>> {
    keyword("move")
        .ignore_then(number::<usize>("position"))
        .then_ignore(whitespace().at_least(1))
        .then(number::<usize>("position"))
        .map(|(from, to)| Action::Move { from, to })
}

fn action_status() -> impl Parser<char, Action, Error = Simple<char>> {
    let status = just("publish")
        .to(ContentStatus::Published)
        .or(just("draft").to(ContentStatus::Draft));

    status
        .then_ignore(whitespace().at_least(1))
        .then(number::<ContentId>("content id"))
        .map(|(status, content)| Action::Status { content, status })
}

fn action_delete() -> impl Parser<char, Action, Error = Simple<char>> {
    keyword("delete")
        .ignore_then(number::<ContentId>("content id"))
        .map(|content| Action::Delete { content })
}

fn action_members() -> impl Parser<char, Action, Error = Simple<char>> {
    just("members").to(Action::Members)
}

fn action_upload() -> impl Parser<char, Action, Error = Simple<char>> {
    keyword("upload").ignore_then(
        take_until(end()).try_map(|(chars, _), span| {
            let path = chars.into_iter().collect::<String>();
            let path = path.trim();
            if path.is_empty() {
                return Err(Simple::custom(span, "missing file path"));
            }
            Ok(Action::Upload {
                path: PathBuf::from(path),
            })
        }),
    )
}

fn action_exit() -> impl Parser<char, Action, Error = Simple<char>> {
    choice((just("exit"), just("quit"))).to(Action::Exit)
}

fn number<T: FromStr>(what: &'static str) -> impl Parser<char, T, Error = Simple<char>> {
    text::int(10).try_map(move |digits: String, span| {
        digits
            .parse()
            .map_err(|_| Simple::custom(span, format!("invalid {what}")))
    })
}

/// A player clock reading such as `12` or `93.5`.
fn seconds() -> impl Parser<char, f64, Error = Simple<char>> {
    text::int(10)
        .then(just('.').ignore_then(text::digits(10)).or_not())
        .try_map(|(whole, fraction): (String, Option<String>), span| {
            let text = match fraction {
                Some(fraction) => format!("{whole}.{fraction}"),
                None => whole,
            };
            text.parse()
                .map_err(|_| Simple::custom(span, "invalid number of seconds"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar() {
        assert_eq!(
            parse("course 12").unwrap(),
            Action::Course {
                course: CourseId(12)
            }
        );
        assert_eq!(parse("  list ").unwrap(), Action::List);
        assert_eq!(parse("members").unwrap(), Action::Members);
        assert_eq!(parse("quit").unwrap(), Action::Exit);
        assert_eq!(parse("").unwrap(), Action::None);
    }

    #[test]
    fn parse_playback_events() {
        assert_eq!(
            parse("tick 7 93.5 600").unwrap(),
            Action::Tick {
                content: ContentId(7),
                current_time: 93.5,
                duration: 600.0
            }
        );
        assert_eq!(
            parse("end 7").unwrap(),
            Action::End {
                content: ContentId(7)
            }
        );
        assert_eq!(
            parse("toggle 7").unwrap(),
            Action::Toggle {
                content: ContentId(7)
            }
        );
    }

    #[test]
    fn parse_progress_query() {
        assert_eq!(
            parse("progress 7").unwrap(),
            Action::Progress {
                content: ContentId(7)
            }
        );
        assert!(parse("progress").is_err());
    }

    #[test]
    fn parse_admin_actions() {
        assert_eq!(parse("move 3 0").unwrap(), Action::Move { from: 3, to: 0 });
        assert_eq!(
            parse("draft 4").unwrap(),
            Action::Status {
                content: ContentId(4),
                status: ContentStatus::Draft
            }
        );
        assert_eq!(
            parse("publish 4").unwrap(),
            Action::Status {
                content: ContentId(4),
                status: ContentStatus::Published
            }
        );
        assert_eq!(
            parse("delete 4").unwrap(),
            Action::Delete {
                content: ContentId(4)
            }
        );
    }

    #[test]
    fn parse_upload_path_with_spaces() {
        assert_eq!(
            parse("upload /tmp/my cover.png").unwrap(),
            Action::Upload {
                path: PathBuf::from("/tmp/my cover.png")
            }
        );
    }

    #[test]
    fn reject_malformed_input() {
        assert!(parse("course abc").is_err());
        assert!(parse("move 1").is_err());
        assert!(parse("dance").is_err());
        assert!(parse("upload ").is_err());
    }
}
