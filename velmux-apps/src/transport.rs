use std::{io::Write, sync::Mutex};

use serde::Serialize;
use velmux::{BaseVelocity, MoveBase};

use crate::Error;

/// One line of the stdin protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum InputLine {
    /// `<source> <x> <y> <theta>`
    Command {
        source: String,
        velocity: BaseVelocity,
    },
    /// `lock <source>` or `unlock <source>`
    Lock { source: String, locked: bool },
}

impl InputLine {
    /// Parses one line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, Error> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let invalid = |message: &str| Error::InvalidLine {
            line: line.to_owned(),
            message: message.to_owned(),
        };
        let words: Vec<_> = line.split_whitespace().collect();
        match words.as_slice() {
            ["lock", source] => Ok(Some(Self::Lock {
                source: source.to_string(),
                locked: true,
            })),
            ["unlock", source] => Ok(Some(Self::Lock {
                source: source.to_string(),
                locked: false,
            })),
            [source, x, y, theta] => {
                let parse = |s: &str| {
                    s.parse::<f64>()
                        .map_err(|e| invalid(&format!("{s:?} is not a number ({e})")))
                };
                Ok(Some(Self::Command {
                    source: source.to_string(),
                    velocity: BaseVelocity::new(parse(*x)?, parse(*y)?, parse(*theta)?),
                }))
            }
            _ => Err(invalid(
                "expected `<source> <x> <y> <theta>`, `lock <source>` or `unlock <source>`",
            )),
        }
    }
}

#[derive(Serialize)]
struct VelocityLine {
    x: f64,
    y: f64,
    theta: f64,
}

/// `MoveBase` writing every velocity as one JSON object per line,
/// `{"x":..,"y":..,"theta":..}`. `topic` only names the stream in errors.
#[derive(Debug)]
pub struct JsonLinesMoveBase<W> {
    topic: String,
    writer: Mutex<W>,
    last: Mutex<BaseVelocity>,
}

impl<W> JsonLinesMoveBase<W>
where
    W: Write + Send,
{
    pub fn new(topic: impl Into<String>, writer: W) -> Self {
        Self {
            topic: topic.into(),
            writer: Mutex::new(writer),
            last: Mutex::new(BaseVelocity::default()),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap()
    }
}

impl<W> MoveBase for JsonLinesMoveBase<W>
where
    W: Write + Send,
{
    fn send_velocity(&self, velocity: &BaseVelocity) -> Result<(), velmux::Error> {
        let line = VelocityLine {
            x: velocity.x,
            y: velocity.y,
            theta: velocity.theta,
        };
        let mut writer = self.writer.lock().unwrap();
        serde_json::to_writer(&mut *writer, &line)
            .map_err(|e| velmux::Error::Other(e.into()))?;
        writeln!(writer)
            .and_then(|()| writer.flush())
            .map_err(|e| velmux::Error::Connection {
                message: format!("failed to write {}: {e}", self.topic),
            })?;
        *self.last.lock().unwrap() = *velocity;
        Ok(())
    }

    fn current_velocity(&self) -> Result<BaseVelocity, velmux::Error> {
        Ok(*self.last.lock().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(InputLine::parse("").unwrap(), None);
        assert_eq!(InputLine::parse("  # comment").unwrap(), None);
        assert_eq!(
            InputLine::parse("joystick 1.0 0 -0.5").unwrap(),
            Some(InputLine::Command {
                source: "joystick".into(),
                velocity: BaseVelocity::new(1.0, 0.0, -0.5),
            })
        );
        assert_eq!(
            InputLine::parse("lock joystick").unwrap(),
            Some(InputLine::Lock {
                source: "joystick".into(),
                locked: true,
            })
        );
        assert_eq!(
            InputLine::parse("unlock joystick\n").unwrap(),
            Some(InputLine::Lock {
                source: "joystick".into(),
                locked: false,
            })
        );
        assert!(InputLine::parse("joystick 1.0 0").is_err());
        assert!(InputLine::parse("joystick a 0 0").is_err());
        assert!(InputLine::parse("lock").is_err());
        // non-finite values parse; the mux rejects them
        assert!(matches!(
            InputLine::parse("joystick NaN 0 0").unwrap(),
            Some(InputLine::Command { velocity, .. }) if !velocity.is_finite()
        ));
    }

    #[test]
    fn test_json_lines() {
        let base = JsonLinesMoveBase::new("cmd_vel", Vec::new());
        base.send_velocity(&BaseVelocity::new(0.5, 0.0, -1.0))
            .unwrap();
        base.send_velocity(&BaseVelocity::default()).unwrap();
        assert_approx_eq!(base.current_velocity().unwrap().theta, 0.0);

        let out = String::from_utf8(base.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        let keys = lines[0].as_object().unwrap();
        assert_eq!(keys.len(), 3);
        assert!(["x", "y", "theta"].iter().all(|k| keys.contains_key(*k)));
        assert_approx_eq!(lines[0]["x"].as_f64().unwrap(), 0.5);
        assert_approx_eq!(lines[0]["theta"].as_f64().unwrap(), -1.0);
        assert_approx_eq!(lines[1]["x"].as_f64().unwrap(), 0.0);
    }
}
