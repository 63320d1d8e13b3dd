//! svnpm - install Subversion-hosted packages into an npm project
//!
//! svnpm reads the `svnDependencies` block of a host project's `package.json`,
//! checks every dependency out of Subversion, locates the package archive in
//! the checkout and installs it with `npm install`. Revisions that are already
//! installed are remembered in a small revision cache under `node_modules`, so
//! repeated runs only touch what changed.
//!
//! # Architecture
//!
//! - [`manifest`] - host `package.json` access, script integration
//! - [`descriptor`] - one normalized record per configured dependency
//! - [`pipeline`] - bounded-concurrency orchestration and the run report
//! - [`svn`] / [`npm`] - the external tools behind async traits
//! - [`installer`] - staging directories, archive discovery, install serialization
//! - [`cache`] - the revision cache and its file lock
//! - [`config`] - global and per-project svn options
//!
//! # Host manifest
//!
//! ```json
//! {
//!   "scripts": { "install": "svnpm run" },
//!   "svnDependencies": {
//!     "libfoo": "svn://svn.example.com/libfoo/trunk",
//!     "libbar|1432": "https://svn.example.com/repos/libbar/tags/2.1"
//!   },
//!   "svnOptions": { "trustServerCert": true, "maxParallel": 2 }
//! }
//! ```
//!
//! # Library use
//!
//! ```rust,no_run
//! use svnpm_cli::cache::RevisionCache;
//! use svnpm_cli::descriptor::build_descriptors;
//! use svnpm_cli::manifest::HostManifest;
//! use svnpm_cli::npm::Npm;
//! use svnpm_cli::pipeline::{self, PipelineContext, PipelineSettings};
//! use svnpm_cli::svn::SvnClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let manifest = HostManifest::load("package.json".as_ref())?;
//! let staging_root = manifest.staging_root();
//! let mut descriptors = build_descriptors(
//!     manifest.svn_dependencies().iter().map(|(k, v)| (k, v)),
//!     &staging_root,
//! );
//!
//! let cache = RevisionCache::load(&RevisionCache::path_in(&staging_root))?;
//! pipeline::mark_up_to_date(&mut descriptors, &cache, false);
//!
//! let (svn, npm) = (SvnClient::default(), Npm::default());
//! let settings = PipelineSettings::new(manifest.project_dir());
//! let ctx = PipelineContext::new(settings, &svn, &npm, &cache);
//! let report = pipeline::run(&ctx, descriptors).await?;
//! println!("{}", report.render());
//! # Ok(())
//! # }
//! ```

// Core functionality modules
pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod pipeline;

// Host project
pub mod descriptor;
pub mod manifest;

// External tools
pub mod npm;
pub mod svn;

// Supporting modules
pub mod constants;
pub mod installer;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
