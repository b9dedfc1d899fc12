//! Route-instance permission expansion
//!
//! A route secured with `resource:read:{id}` is checked at request time
//! against the concrete id. For route `/resource/:id` and request
//! `/resource/2` the requirement becomes `resource:read:2`.

/// Router parameter marker
pub const PARAM_MARKER: char = ':';

/// Pair route parameters with the request's values
///
/// Segments are aligned by position. Parameters with no corresponding
/// request segment are left out.
pub fn route_params<'a>(route: &'a str, request_path: &'a str) -> Vec<(&'a str, &'a str)> {
    route
        .split('/')
        .zip(request_path.split('/'))
        .filter_map(|(route_segment, value)| {
            route_segment
                .strip_prefix(PARAM_MARKER)
                .filter(|name| !name.is_empty())
                .map(|name| (name, value))
        })
        .collect()
}

/// Substitute every `{param}` in `permissions` with the request's value
///
/// Placeholders that name no route parameter are left as they are.
///
/// ```
/// use gatehouse_authz::permission::expand_route_instance_permissions;
///
/// let expanded = expand_route_instance_permissions(
///     &["claim:read:{claimid}".to_string()],
///     "/policies/:policyid/claims/:claimid",
///     "/policies/SFIH1/claims/37103",
/// );
/// assert_eq!(expanded, vec!["claim:read:37103".to_string()]);
/// ```
pub fn expand_route_instance_permissions<S: AsRef<str>>(
    permissions: &[S],
    route: &str,
    request_path: &str,
) -> Vec<String> {
    let params = route_params(route, request_path);

    permissions
        .iter()
        .map(|permission| {
            params
                .iter()
                .fold(permission.as_ref().to_string(), |expanded, (name, value)| {
                    expanded.replace(&format!("{{{}}}", name), value)
                })
        })
        .collect()
}
