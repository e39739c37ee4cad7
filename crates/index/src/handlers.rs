//! Handlers of the legacy query methods.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rpcgate_rpc::{BoundArgs, Handler};
use rpcgate_types::{CallContext, ErrorKind, Fault, Map, Value};
use serde_json::json;

use crate::{
    links::Links,
    model::{File, JournalEntry, Project, Release},
    store::{IndexError, PackageIndex, CHANGELOG_LIMIT},
};

/// The query a [`Query`] handler answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueryKind {
    ListPackages,
    ListPackagesWithSerial,
    PackageHostingMode,
    UserPackages,
    PackageReleases,
    ReleaseData,
    ReleaseUrls,
    PackageRoles,
    ChangelogLastSerial,
    ChangelogSinceSerial,
    Changelog,
    Browse,
}

/// Handler running one [`QueryKind`] against the index.
pub(crate) struct Query {
    kind: QueryKind,
    index: Arc<dyn PackageIndex>,
    links: Arc<Links>,
}

impl Query {
    pub(crate) fn new(kind: QueryKind, index: Arc<dyn PackageIndex>, links: Arc<Links>) -> Self {
        Self { kind, index, links }
    }

    async fn answer(&self, ctx: &CallContext, args: &BoundArgs) -> Result<Value, Fault> {
        let index = self.index.as_ref();
        let value = match self.kind {
            QueryKind::ListPackages => json!(index.project_names().await.map_err(lookup(ctx))?),
            QueryKind::ListPackagesWithSerial => {
                let serials = index.project_serials().await.map_err(lookup(ctx))?;
                Value::Object(serials.into_iter().map(|(name, serial)| (name, json!(serial))).collect())
            }
            QueryKind::PackageHostingMode => json!("pypi-only"),
            QueryKind::UserPackages => {
                let roles = index.user_roles(args.str("username")?).await.map_err(lookup(ctx))?;
                roles.into_iter().map(|role| json!([role.role_name, role.project])).collect()
            }
            QueryKind::PackageReleases => {
                let Some(project) = self.project(ctx, args).await? else {
                    return Ok(json!([]));
                };
                let releases = if args.bool("show_hidden")? {
                    project.all_versions()
                } else {
                    project.latest_version().into_iter().collect()
                };
                releases.into_iter().map(|release| json!(release.version)).collect()
            }
            QueryKind::ReleaseData => {
                let version = args.str("version")?;
                let release = self.project(ctx, args).await?.and_then(|project| {
                    let release = project.release(version)?.clone();
                    Some((project, release))
                });
                match release {
                    Some((project, release)) => self.release_data(&project, &release),
                    None => json!({}),
                }
            }
            QueryKind::ReleaseUrls => {
                let version = args.str("version")?;
                let project = self.project(ctx, args).await?;
                let files = project.as_ref().and_then(|project| project.release(version));
                files
                    .map(|release| release.files.iter().map(|file| self.file_data(file)).collect())
                    .unwrap_or_else(|| json!([]))
            }
            QueryKind::PackageRoles => {
                let roles =
                    index.project_roles(args.str("package_name")?).await.map_err(lookup(ctx))?;
                roles.into_iter().map(|role| json!([role.role_name, role.username])).collect()
            }
            QueryKind::ChangelogLastSerial => json!(index.last_serial().await.map_err(lookup(ctx))?),
            QueryKind::ChangelogSinceSerial => {
                let serial = args.int("serial")?;
                let entries =
                    index.journal_since_serial(serial, CHANGELOG_LIMIT).await.map_err(lookup(ctx))?;
                entries.iter().map(|entry| changelog_row(entry, true)).collect()
            }
            QueryKind::Changelog => {
                let since = args.int("since")?;
                let with_ids = args.bool("with_ids")?;
                let since = DateTime::<Utc>::from_timestamp(since, 0).ok_or_else(|| {
                    Fault::wrapped(ErrorKind::Value, format!("timestamp {since} is out of range"))
                })?;
                let entries = index.journal_since(since, CHANGELOG_LIMIT).await.map_err(lookup(ctx))?;
                entries.iter().map(|entry| changelog_row(entry, with_ids)).collect()
            }
            QueryKind::Browse => {
                let classifiers: Vec<String> =
                    args.str_list("classifiers")?.into_iter().map(str::to_string).collect();
                let releases =
                    index.releases_with_classifiers(&classifiers).await.map_err(lookup(ctx))?;
                releases.into_iter().map(|(name, version)| json!([name, version])).collect()
            }
        };
        Ok(value)
    }

    async fn project(&self, ctx: &CallContext, args: &BoundArgs) -> Result<Option<Project>, Fault> {
        self.index.project(args.str("package_name")?).await.map_err(lookup(ctx))
    }

    fn release_data(&self, project: &Project, release: &Release) -> Value {
        let project_urls: Vec<String> =
            release.project_urls.iter().map(|link| format!("{}, {}", link.label, link.url)).collect();
        json!({
            "name": project.name,
            "version": release.version,
            "stable_version": null,
            "bugtrack_url": null,
            "package_url": self.links.project(&project.name),
            "release_url": self.links.release(&project.name, &release.version),
            "docs_url": project.documentation_url,
            "home_page": release.home_page,
            "download_url": release.download_url,
            "project_url": project_urls,
            "author": release.author,
            "author_email": release.author_email,
            "maintainer": release.maintainer,
            "maintainer_email": release.maintainer_email,
            "summary": release.summary,
            "description": release.description,
            "license": release.license,
            "keywords": release.keywords,
            "platform": release.platform,
            "classifiers": release.classifiers,
            "requires": release.requires,
            "requires_dist": release.requires_dist,
            "provides": release.provides,
            "provides_dist": release.provides_dist,
            "obsoletes": release.obsoletes,
            "obsoletes_dist": release.obsoletes_dist,
            "requires_python": release.requires_python,
            "requires_external": release.requires_external,
            "_pypi_ordering": release.ordering,
            "downloads": {"last_day": -1, "last_week": -1, "last_month": -1},
            "cheesecake_code_kwalitee_id": null,
            "cheesecake_documentation_id": null,
            "cheesecake_installability_id": null,
        })
    }

    fn file_data(&self, file: &File) -> Value {
        let uploaded = iso_timestamp(&file.upload_time);
        let mut digests = Map::new();
        digests.insert("md5".into(), json!(file.md5_digest));
        digests.insert("sha256".into(), json!(file.sha256_digest));
        json!({
            "filename": file.filename,
            "packagetype": file.packagetype,
            "python_version": file.python_version,
            "size": file.size,
            "md5_digest": file.md5_digest,
            "sha256_digest": file.sha256_digest,
            "digests": digests,
            "has_sig": false,
            "upload_time": uploaded,
            "upload_time_iso_8601": uploaded,
            "comment_text": file.comment_text,
            "downloads": -1,
            "path": file.path,
            "url": self.links.file(&file.path),
        })
    }
}

#[async_trait]
impl Handler for Query {
    async fn call(&self, ctx: &CallContext, args: BoundArgs) -> Result<Value, Fault> {
        self.answer(ctx, &args).await
    }
}

/// Map a store failure to the wrapped lookup fault, logging it.
fn lookup(ctx: &CallContext) -> impl Fn(IndexError) -> Fault + '_ {
    move |err| {
        warn!(method = %ctx.method, %err, "package index lookup failed");
        Fault::lookup(err.to_string())
    }
}

/// `[name, version, timestamp, action]`, plus the id when `with_id`.
fn changelog_row(entry: &JournalEntry, with_id: bool) -> Value {
    let mut row = vec![
        json!(entry.name),
        json!(entry.version),
        json!(entry.submitted_date.timestamp()),
        json!(entry.action),
    ];
    if with_id {
        row.push(json!(entry.id));
    }
    Value::Array(row)
}

/// UTC timestamp as `YYYY-MM-DDTHH:MM:SS[.ffffff]Z`.
/// Second precision, or exactly six fractional digits when there are
/// microseconds to show.
fn iso_timestamp(at: &DateTime<Utc>) -> String {
    let pattern =
        if at.timestamp_subsec_micros() == 0 { "%Y-%m-%dT%H:%M:%S" } else { "%Y-%m-%dT%H:%M:%S%.6f" };
    format!("{}Z", at.naive_utc().format(pattern))
}
