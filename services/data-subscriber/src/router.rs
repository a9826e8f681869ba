use tracing::info;

/// Final topic segment of the only message type the pipeline handles
pub const SYNOP_SEGMENT: &str = "SYNOP";

/// Decision on whether a message enters the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Accepted,
    Skipped { segment: String },
}

/// Route a message by the last `/`-separated segment of its topic
pub fn route(topic: &str) -> RouteDecision {
    let segment = last_segment(topic);

    if segment == SYNOP_SEGMENT {
        RouteDecision::Accepted
    } else {
        info!(topic = %topic, segment = %segment, "{} != {}, skip data", segment, SYNOP_SEGMENT);
        RouteDecision::Skipped {
            segment: segment.to_string(),
        }
    }
}

/// Last `/`-separated segment; a topic without `/` is its own segment
pub fn last_segment(topic: &str) -> &str {
    topic.rsplit('/').next().unwrap_or(topic)
}
