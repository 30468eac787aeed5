pub mod fs_watcher;

pub use fs_watcher::FsDevServer;
