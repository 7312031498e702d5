//! Competition task import: the JSON task list format, falling back to an
//! XCSoar `.tsk` file.

use ogn_core::{OgnError, OgnResult};
use ogn_geo::{sphere, Coordinate};
use ogn_map::{Feature, Geometry, Rgba, Style, VectorLayer};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Deserialize;

pub const DEFAULT_COLOUR: &str = "FF0000";
pub const ZONE_VERTICES: usize = 64;
const ZONE_FILL_ALPHA: f64 = 0.1;
const LINE_WIDTH: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Turnpoint {
    pub position: Coordinate,
    /// Cylinder radius in metres.
    pub radius_m: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    pub name: Option<String>,
    pub colour: Option<String>,
    pub turnpoints: Vec<Turnpoint>,
    /// FLARM ids of the competitors.
    pub whitelist: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TaskFile {
    tasks: Vec<TaskEntry>,
}

#[derive(Debug, Deserialize)]
struct TaskEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    legs: Vec<Vec<f64>>,
    #[serde(default)]
    wlist: Vec<String>,
}

/// Reads a task file, trying JSON first.
pub fn parse_tasks(content: &str) -> OgnResult<Vec<Task>> {
    let content = content.trim();
    match parse_json(content) {
        Ok(tasks) => Ok(tasks),
        Err(json_err) => parse_xcsoar(content).map(|task| vec![task]).map_err(|xml_err| {
            OgnError::invalid(format!(
                "task is neither JSON ({json_err}) nor XCSoar XML ({})",
                xml_err.message
            ))
        }),
    }
}

fn parse_json(content: &str) -> Result<Vec<Task>, serde_json::Error> {
    let file: TaskFile = serde_json::from_str(content)?;
    Ok(file
        .tasks
        .into_iter()
        .map(|entry| {
            let mut turnpoints: Vec<Turnpoint> = Vec::new();
            for leg in entry.legs {
                match leg.as_slice() {
                    [lat, lon, ..] => turnpoints.push(Turnpoint {
                        position: Coordinate::new(*lat, *lon),
                        radius_m: None,
                    }),
                    // A lone number turns the previous turnpoint into a cylinder.
                    [radius] => match turnpoints.last_mut() {
                        Some(previous) => previous.radius_m = Some(*radius),
                        None => tracing::debug!(radius, "radius leg before any turnpoint"),
                    },
                    [] => {}
                }
            }
            Task {
                name: entry.name,
                colour: entry.color,
                turnpoints,
                whitelist: entry.wlist,
            }
        })
        .collect())
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|attribute| attribute.unescape_value().ok().map(|value| value.into_owned()))
}

fn parse_xcsoar(content: &str) -> OgnResult<Task> {
    let mut reader = Reader::from_str(content);
    let mut turnpoints = Vec::new();
    let mut in_point = false;
    let mut location: Option<Coordinate> = None;
    let mut radius: Option<f64> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| OgnError::invalid(format!("malformed task XML: {err}")))?;
        match event {
            Event::Start(element) if element.name().as_ref() == b"Point" => {
                in_point = true;
                location = None;
                radius = None;
            }
            Event::End(element) if element.name().as_ref() == b"Point" => {
                in_point = false;
                if let Some(position) = location.take() {
                    turnpoints.push(Turnpoint {
                        position,
                        radius_m: radius.take(),
                    });
                }
            }
            Event::Start(element) | Event::Empty(element) if in_point => {
                match element.name().as_ref() {
                    b"Location" if location.is_none() => {
                        let lat = attribute(&element, b"latitude")
                            .and_then(|value| value.trim().parse::<f64>().ok());
                        let lon = attribute(&element, b"longitude")
                            .and_then(|value| value.trim().parse::<f64>().ok());
                        if let (Some(lat), Some(lon)) = (lat, lon) {
                            location = Some(Coordinate::new(lat, lon));
                        }
                    }
                    b"ObservationZone" => {
                        if attribute(&element, b"type").as_deref() == Some("Cylinder") {
                            radius = attribute(&element, b"radius")
                                .and_then(|value| value.trim().parse::<f64>().ok());
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if turnpoints.is_empty() {
        return Err(OgnError::invalid("task XML has no turnpoints"));
    }
    Ok(Task {
        turnpoints,
        ..Task::default()
    })
}

/// Draws the imported tasks: a leg line through every turnpoint and a lightly
/// filled zone for each cylinder.
pub fn render(tasks: &[Task], layer: &mut VectorLayer<String>) {
    layer.clear();
    for (index, task) in tasks.iter().enumerate() {
        let hex = task.colour.as_deref().unwrap_or(DEFAULT_COLOUR);
        let colour = Rgba::parse(hex).unwrap_or_else(|err| {
            tracing::warn!(colour = %hex, error = %err, "invalid task colour");
            Rgba::RED
        });
        let name = task
            .name
            .clone()
            .unwrap_or_else(|| format!("task {}", index + 1));

        for (number, turnpoint) in task.turnpoints.iter().enumerate() {
            let Some(radius) = turnpoint.radius_m else {
                continue;
            };
            let zone = sphere::circle(turnpoint.position, radius, ZONE_VERTICES);
            layer.insert(
                format!("{index:02}/zone/{number:02}"),
                Feature::new(
                    Geometry::Polygon(zone),
                    Style::stroke(colour, LINE_WIDTH).with_fill(Rgba::with_alpha(
                        colour.r,
                        colour.g,
                        colour.b,
                        ZONE_FILL_ALPHA,
                    )),
                ),
            );
        }

        let legs = task.turnpoints.iter().map(|tp| tp.position).collect();
        layer.insert(
            format!("{index:02}/legs"),
            Feature::new(Geometry::LineString(legs), Style::stroke(colour, LINE_WIDTH))
                .with_title(name),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{"tasks":[{"name":"Day 3","color":"0000FF",
        "legs":[[46.1,7.1],[500],[46.5,7.5],[47.0,8.0],[1000]],
        "wlist":["DD1234","ABCDEF"]},{"legs":[[45.0,6.0],[45.5,6.5]]}]}"#;

    const XCSOAR: &str = r#"<?xml version="1.0"?>
<Task type="RT">
  <Point type="Start">
    <Waypoint name="Bex"><Location latitude="46.25" longitude="6.98"/></Waypoint>
    <ObservationZone type="Cylinder" radius="3000"/>
  </Point>
  <Point type="Turn">
    <Waypoint name="Sion"><Location latitude="46.22" longitude="7.33"/></Waypoint>
    <ObservationZone type="Line" length="1000"/>
  </Point>
</Task>"#;

    #[test]
    fn json_radius_legs_attach_to_previous_turnpoint() {
        let tasks = parse_tasks(JSON).unwrap();
        assert_eq!(tasks.len(), 2);
        let task = &tasks[0];
        assert_eq!(task.name.as_deref(), Some("Day 3"));
        assert_eq!(task.turnpoints.len(), 3);
        assert_eq!(task.turnpoints[0].radius_m, Some(500.0));
        assert_eq!(task.turnpoints[1].radius_m, None);
        assert_eq!(task.turnpoints[2].radius_m, Some(1000.0));
        assert_eq!(task.whitelist, ["DD1234", "ABCDEF"]);
        assert!(tasks[1].whitelist.is_empty());
    }

    #[test]
    fn falls_back_to_xcsoar() {
        let tasks = parse_tasks(XCSOAR).unwrap();
        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.turnpoints.len(), 2);
        assert_eq!(task.turnpoints[0].position, Coordinate::new(46.25, 6.98));
        assert_eq!(task.turnpoints[0].radius_m, Some(3000.0));
        assert_eq!(task.turnpoints[1].radius_m, None);
    }

    #[test]
    fn unreadable_tasks_are_rejected() {
        assert!(parse_tasks("not a task").is_err());
        assert!(parse_tasks("<Task></Task>").is_err());
    }

    #[test]
    fn render_draws_legs_and_zones() {
        let tasks = parse_tasks(JSON).unwrap();
        let mut layer = VectorLayer::new("task", 25, false);
        render(&tasks, &mut layer);
        // Two zones and one leg line for the first task, one leg line for the second.
        assert_eq!(layer.len(), 4);

        let legs = layer.get(&"00/legs".to_string()).unwrap();
        assert_eq!(legs.title.as_deref(), Some("Day 3"));
        assert_eq!(
            legs.style.stroke.as_ref().unwrap().colour,
            Rgba::opaque(0, 0, 255)
        );
        let zone = layer.get(&"00/zone/00".to_string()).unwrap();
        assert_eq!(zone.style.fill, Some(Rgba::new(0, 0, 255, 26)));

        let second = layer.get(&"01/legs".to_string()).unwrap();
        assert_eq!(second.title.as_deref(), Some("task 2"));
        assert_eq!(second.style.stroke.as_ref().unwrap().colour, Rgba::RED);
    }
}
