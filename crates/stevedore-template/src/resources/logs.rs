use serde_json::json;

use super::names;
use crate::fragment::Fragment;
use crate::synth::Synthesizer;

impl Synthesizer<'_> {
    /// Log group receiving every container's `awslogs` stream.
    pub fn log_group(&self) -> Fragment {
        Fragment::new(
            names::LOG_GROUP,
            "AWS::Logs::LogGroup",
            json!({ "LogGroupName": self.ctx.log_group_name() }),
        )
    }
}
