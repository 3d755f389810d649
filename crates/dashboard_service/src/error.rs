use domain::ChannelId;
use std::fmt;
use thiserror::Error;
use youtube_api::ApiError;

/// Pipeline stage that talked to the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    ChannelDetails,
    VideoList,
    VideoDetails,
    Comments,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Resolve => "channel lookup",
            Stage::ChannelDetails => "channel details",
            Stage::VideoList => "video list",
            Stage::VideoDetails => "video statistics",
            Stage::Comments => "comments",
        })
    }
}

/// Why a pipeline run halted. `Display` is the single user-facing warning.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Please enter an API key and a channel name.")]
    MissingInput,
    #[error("Invalid Channel Name. Please check and enter a valid Channel Name.")]
    ChannelNotFound { name: String },
    #[error("Invalid YouTube Channel or data not available. Please check your inputs.")]
    ChannelUnavailable { channel_id: ChannelId },
    #[error("The channel has no videos with statistics to show.")]
    NoVideos { channel_id: ChannelId },
    #[error("Could not load the {stage}: {source}")]
    Fetch {
        stage: Stage,
        #[source]
        source: ApiError,
    },
}

impl PipelineError {
    pub(crate) fn fetch(stage: Stage) -> impl FnOnce(ApiError) -> Self {
        move |source| PipelineError::Fetch { stage, source }
    }

    /// Halted because the user asked for something that does not exist
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::ChannelNotFound { .. } | PipelineError::MissingInput
        )
    }
}
