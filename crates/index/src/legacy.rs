//! The legacy method table.

use std::sync::Arc;

use rpcgate_rpc::{
    CachePolicy, GatewayBuilder, MethodSpec, ParamType, ParameterSchema, RegistrationError,
};
use serde_json::json;

use crate::{
    deprecated,
    handlers::{Query, QueryKind},
    links::Links,
    store::PackageIndex,
};

/// Endpoint aliases every legacy method is served under.
pub const ENDPOINTS: [&str; 3] = ["RPC2", "pypi", "pypi_slash"];

/// Specs of every legacy method, bound to [`ENDPOINTS`].
pub fn legacy_methods(index: Arc<dyn PackageIndex>, links: Links) -> Vec<MethodSpec> {
    let links = Arc::new(links);
    let query = |name: &str, kind: QueryKind| {
        MethodSpec::new(name, Query::new(kind, Arc::clone(&index), Arc::clone(&links)))
    };
    let package_name = || ParameterSchema::new().required("package_name", ParamType::Str);
    let package_version = || package_name().required("version", ParamType::Str);

    let specs = vec![
        deprecated::search(links.domain()),
        query("list_packages", QueryKind::ListPackages).cache(CachePolicy::all_projects()),
        query("list_packages_with_serial", QueryKind::ListPackagesWithSerial)
            .cache(CachePolicy::all_projects()),
        query("package_hosting_mode", QueryKind::PackageHostingMode).schema(package_name()),
        query("user_packages", QueryKind::UserPackages)
            .schema(ParameterSchema::new().required("username", ParamType::Str)),
        deprecated::top_packages(),
        query("package_releases", QueryKind::PackageReleases)
            .schema(package_name().optional("show_hidden", ParamType::Bool, json!(false)))
            .cache(CachePolicy::by_project()),
        deprecated::package_data(),
        query("release_data", QueryKind::ReleaseData)
            .schema(package_version())
            .cache(CachePolicy::by_project()),
        deprecated::package_urls(),
        query("release_urls", QueryKind::ReleaseUrls)
            .schema(package_version())
            .cache(CachePolicy::by_project()),
        query("package_roles", QueryKind::PackageRoles)
            .schema(package_name())
            .cache(CachePolicy::by_project()),
        query("changelog_last_serial", QueryKind::ChangelogLastSerial),
        query("changelog_since_serial", QueryKind::ChangelogSinceSerial)
            .schema(ParameterSchema::new().required("serial", ParamType::Int)),
        query("changelog", QueryKind::Changelog).schema(
            ParameterSchema::new()
                .required("since", ParamType::Int)
                .optional("with_ids", ParamType::Bool, json!(false)),
        ),
        query("browse", QueryKind::Browse)
            .schema(ParameterSchema::new().required("classifiers", ParamType::list(ParamType::Str))),
        deprecated::multicall(),
    ];

    specs.into_iter().map(|spec| spec.aliases(ENDPOINTS)).collect()
}

/// Register every legacy method on `builder`.
///
/// # Errors
///
/// Returns an error if one of the methods is already registered.
pub fn register(
    builder: &mut GatewayBuilder,
    index: Arc<dyn PackageIndex>,
    links: Links,
) -> Result<(), RegistrationError> {
    let specs = legacy_methods(index, links);
    let methods = specs.len();
    builder.register_all(specs)?;
    info!(methods, endpoints = ?ENDPOINTS, "registered legacy methods");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryIndex;

    fn specs() -> Vec<MethodSpec> {
        legacy_methods(
            Arc::new(MemoryIndex::default()),
            Links::new("pypi.org", "https://files.example/{path}"),
        )
    }

    #[test]
    fn test_method_table() {
        let specs = specs();
        let names: Vec<_> = specs.iter().map(MethodSpec::name).collect();
        assert_eq!(
            names,
            vec![
                "search",
                "list_packages",
                "list_packages_with_serial",
                "package_hosting_mode",
                "user_packages",
                "top_packages",
                "package_releases",
                "package_data",
                "release_data",
                "package_urls",
                "release_urls",
                "package_roles",
                "changelog_last_serial",
                "changelog_since_serial",
                "changelog",
                "browse",
                "system.multicall",
            ]
        );
        for spec in &specs {
            let aliases: Vec<_> = spec.endpoint_aliases().iter().map(String::as_str).collect();
            assert_eq!(aliases, vec!["RPC2", "pypi", "pypi_slash"], "{}", spec.name());
        }
    }

    #[test]
    fn test_cache_policies() {
        let cached: Vec<_> = specs()
            .iter()
            .filter_map(|spec| {
                let policy = spec.cache_policy()?;
                Some((spec.name().to_string(), policy.template().to_string()))
            })
            .collect();
        assert_eq!(
            cached,
            vec![
                ("list_packages".to_string(), "all-projects".to_string()),
                ("list_packages_with_serial".to_string(), "all-projects".to_string()),
                ("package_releases".to_string(), "project/%s".to_string()),
                ("release_data".to_string(), "project/%s".to_string()),
                ("release_urls".to_string(), "project/%s".to_string()),
                ("package_roles".to_string(), "project/%s".to_string()),
            ]
        );
    }

    #[test]
    fn test_register_twice_fails() {
        let mut builder = GatewayBuilder::default();
        let index: Arc<dyn PackageIndex> = Arc::new(MemoryIndex::default());
        let links = Links::new("pypi.org", "https://files.example/{path}");
        register(&mut builder, Arc::clone(&index), links.clone()).unwrap();
        let err = register(&mut builder, index, links).unwrap_err();
        assert!(matches!(err, RegistrationError::Duplicate { .. }));
    }
}
