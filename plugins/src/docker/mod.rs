mod inspect;
mod logs;

pub use inspect::DockerInspector;
pub use logs::{DockerLogSource, DockerLogStream};
