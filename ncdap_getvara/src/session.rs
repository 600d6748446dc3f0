use std::{sync::Arc, time::Instant};

use ncdap_cache::{Cache, CacheNode};
use ncdap_clap_blocks::cache::{CacheConfig, parse_client_params};
use ncdap_client::{Fetch, FetchKind, HttpFetcher, Payload, PayloadDecoder, is_constrainable};
use ncdap_constraint::{
    Constraint, Odometer, PathVar, Projection, map_constraint, resolve_suffix,
    restrict, restrict_to_variable, strip_pseudo_dims, vara_projection, visible_shape,
    walk_projection,
};
use ncdap_dds::{Dds, NodeId, NodeKind};
use ncdap_types::{NcElement, NcType, Values, check_conversion, convert};
use tracing::{debug, info, warn};
use url::Url;

use crate::{Error, Result, SubsetRequest, walk};

/// How a request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// The whole variable is, or will be, in the payload read from.
    FetchWhole,
    /// Only the requested elements are fetched.
    FetchPart,
    /// A cached payload already holds the whole variable.
    Cached,
}

/// An open dataset: its metadata tree, standing URL constraint, fetch cache and transport.
///
/// Requests mutate the cache, so a session is used from one thread at a time; see
/// [`crate::SharedSession`] for sharing one.
#[derive(Debug)]
pub struct Session {
    url: Url,
    dds: Dds,
    fetcher: Arc<dyn Fetch>,
    config: CacheConfig,
    constrainable: bool,
    url_constraint: Constraint,
    cache: Cache,
    /// Variables the prefetch node is filled with.
    prefetch_vars: Vec<NodeId>,
    prefetched: bool,
}

/// Builder for a [`Session`].
#[derive(Debug)]
pub struct SessionBuilder {
    url: Url,
    dds: Dds,
    fetcher: Arc<dyn Fetch>,
    config: CacheConfig,
    constraint: Option<Constraint>,
}

impl SessionBuilder {
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// The standing constraint every request is composed onto.
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    /// Apply the URL's client parameters and resolve the standing constraint against the tree.
    pub fn build(self) -> Result<Session> {
        let mut config = self.config;
        if let Some(fragment) = self.url.fragment() {
            config.apply_client_params(parse_client_params(fragment));
        }

        let constrainable = is_constrainable(&self.url);
        let mut url_constraint = self.constraint.unwrap_or_default();
        if !constrainable {
            // everything is read from one unconstrained fetch
            config.cache = true;
            if !url_constraint.is_empty() {
                warn!(
                    url = %self.url,
                    constraint = %url_constraint,
                    "source cannot be constrained, ignoring the URL constraint"
                );
                url_constraint = Constraint::default();
            }
        }
        map_constraint(&self.dds, &mut url_constraint)?;

        let prefetch_vars = mark_prefetch(&self.dds, &url_constraint, &config, constrainable);
        let cache = Cache::new(config.cache_limit.bytes(), cache_count(&config));
        debug!(
            url = %self.url,
            constrainable,
            constraint = %url_constraint,
            prefetch_vars = prefetch_vars.len(),
            "opened session"
        );
        Ok(Session {
            url: self.url,
            dds: self.dds,
            fetcher: self.fetcher,
            config,
            constrainable,
            url_constraint,
            cache,
            prefetch_vars,
            prefetched: false,
        })
    }
}

/// With caching off nothing is retained.
fn cache_count(config: &CacheConfig) -> usize {
    if config.cache { config.cache_count } else { 0 }
}

/// The variables worth fetching together up front.
///
/// Every variable of an unconstrainable source when caching is on. Otherwise, if prefetching is
/// enabled, the primitive variables outside sequences with at most `small_size_limit` elements
/// that the URL constraint does not project.
pub fn mark_prefetch(
    dds: &Dds,
    url_constraint: &Constraint,
    config: &CacheConfig,
    constrainable: bool,
) -> Vec<NodeId> {
    if !constrainable {
        return if config.cache {
            dds.variables().collect()
        } else {
            vec![]
        };
    }
    if !config.prefetch {
        return vec![];
    }
    dds.variables()
        .filter(|v| !dds.is_in_sequence(*v))
        .filter(|v| dds.element_count(*v) <= config.small_size_limit)
        .filter(|v| {
            !url_constraint
                .projections
                .iter()
                .any(|p| p.leaf() == Some(*v))
        })
        .collect()
}

/// An HTTP transport for `url`, without its client parameters, honouring the configured
/// timeout.
pub fn http_fetcher(
    url: &Url,
    decoder: Arc<dyn PayloadDecoder>,
    config: &CacheConfig,
) -> Result<HttpFetcher> {
    let mut base_url = url.clone();
    base_url.set_fragment(None);
    let fetcher = HttpFetcher::new(base_url, decoder)?;
    Ok(match config.fetch_timeout() {
        Some(timeout) => fetcher.with_timeout(timeout)?,
        None => fetcher,
    })
}

impl Session {
    pub fn builder(url: Url, dds: Dds, fetcher: Arc<dyn Fetch>) -> SessionBuilder {
        SessionBuilder {
            url,
            dds,
            fetcher,
            config: CacheConfig::default(),
            constraint: None,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn dds(&self) -> &Dds {
        &self.dds
    }

    /// The configuration after client parameters were applied.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_constrainable(&self) -> bool {
        self.constrainable
    }

    /// The standing constraint, resolved against the metadata tree.
    pub fn url_constraint(&self) -> &Constraint {
        &self.url_constraint
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn prefetch_vars(&self) -> &[NodeId] {
        &self.prefetch_vars
    }

    /// The shape requests for `variable` address: the standing constraint's counts for the
    /// dimensions it slices, the declared sizes otherwise.
    pub fn shape(&self, variable: &[&str]) -> Result<Vec<usize>> {
        let var = self.resolve(&PathVar::from_names(variable.iter().copied()))?;
        Ok(visible_shape(&self.dds, &self.url_constraint.projections, var))
    }

    /// Read the requested elements of a variable as `nc_type` values.
    pub fn get_values(&mut self, request: &SubsetRequest, nc_type: NcType) -> Result<Values> {
        self.subset(request, nc_type).map(|(values, _)| values)
    }

    /// Read the requested elements of a variable into a vector of `T`.
    pub fn get_vars<T: NcElement>(&mut self, request: &SubsetRequest) -> Result<Vec<T>> {
        let values = self.get_values(request, T::NC_TYPE)?;
        let nc_type = values.nc_type();
        T::from_values(values).ok_or_else(|| Error::type_mismatch(nc_type, T::NC_TYPE))
    }

    /// Read the requested elements and scatter them into `out`.
    ///
    /// `imap` gives, per dimension, the distance in `out` between consecutive requested
    /// elements; the element with request-relative index `i` lands at `Σ i[d] * imap[d]`.
    pub fn get_varm_into<T: NcElement>(
        &mut self,
        request: &SubsetRequest,
        imap: &[usize],
        out: &mut [T],
    ) -> Result<()> {
        let (values, count) = self.subset(request, T::NC_TYPE)?;
        if imap.len() != count.len() {
            return Err(Error::InvalidCoordinates {
                source: ncdap_constraint::Error::RankMismatch {
                    name: request.variable.join("."),
                    expected: count.len(),
                    actual: imap.len(),
                },
            });
        }
        let mut odom = Odometer::whole(&count, self.config.max_rank)?;
        let needed = odom
            .mapped_extent(imap)
            .ok_or_else(|| Error::IndexMapOverflow {
                name: request.variable.join("."),
                imap: imap.to_vec(),
            })?;
        let len = out.len();
        if needed > len {
            return Err(Error::OutputTooSmall { needed, len });
        }

        let nc_type = values.nc_type();
        let values =
            T::from_values(values).ok_or_else(|| Error::type_mismatch(nc_type, T::NC_TYPE))?;
        for value in values {
            let slot = odom
                .mapped_offset(imap)
                .and_then(|offset| out.get_mut(offset))
                .ok_or(Error::OutputTooSmall { needed, len })?;
            *slot = value;
            odom.advance();
        }
        Ok(())
    }

    /// Swap in a new metadata tree for the same dataset.
    ///
    /// The standing constraint is re-resolved by name against `dds` and every cached payload is
    /// dropped.
    pub fn replace_dds(&mut self, dds: Dds) -> Result<()> {
        let mut constraint = self.url_constraint.clone();
        constraint.detach();
        constraint.attach(&dds)?;
        self.prefetch_vars = mark_prefetch(&dds, &constraint, &self.config, self.constrainable);
        self.url_constraint = constraint;
        self.dds = dds;
        self.cache.clear();
        self.prefetched = false;
        Ok(())
    }

    /// Validate, locate or fetch, and walk. Also returns the per-dimension counts.
    fn subset(
        &mut self,
        request: &SubsetRequest,
        nc_type: NcType,
    ) -> Result<(Values, Vec<usize>)> {
        let var = self.resolve(&PathVar::from_names(request.variable.iter().cloned()))?;
        let stored = self.dds.node(var).nc_type();
        let walked = if stored.is_string() {
            NcType::Char
        } else {
            stored
        };
        check_conversion(walked, nc_type)?;

        let standing = &self.url_constraint.projections;
        let shape = visible_shape(&self.dds, standing, var);
        let (start, count, stride) = request.resolve(&shape);
        let vara = vara_projection(
            &self.dds,
            var,
            &shape,
            &start,
            &count,
            &stride,
            self.config.max_rank,
        )?;
        let merged = restrict_to_variable(&self.dds, standing, &vara)?;
        if count.contains(&0) {
            return Ok((Values::try_with_capacity(nc_type, 0)?, count));
        }

        self.ensure_prefetch()?;
        let (state, node, walk_projection) = self.locate(var, &merged)?;
        debug!(
            variable = %self.dds.full_name(var),
            ?state,
            projection = %merged,
            cache_node = %node.id(),
            "extracting"
        );
        let raw = walk::extract(
            &self.dds,
            var,
            &walk_projection,
            node.payload().as_ref(),
            self.config.max_rank,
        )?;
        Ok((convert(raw, nc_type)?, count))
    }

    /// Find the single primitive variable `path` names.
    fn resolve(&self, path: &PathVar) -> Result<NodeId> {
        let var = resolve_suffix(&self.dds, path)?;
        let kind = self.dds.node(var).kind();
        if kind != NodeKind::Primitive {
            return Err(Error::NotAVariable {
                name: self.dds.full_name(var),
                kind,
            });
        }
        Ok(var)
    }

    /// Decide how `merged` is served, fetching if needed, and return the payload to walk with
    /// the projection to walk it with.
    fn locate(
        &mut self,
        var: NodeId,
        merged: &Projection,
    ) -> Result<(FetchState, Arc<CacheNode>, Projection)> {
        if !self.constrainable {
            let node = self.cache.prefetch().map(Arc::clone).ok_or_else(|| {
                Error::invalid_payload(self.dds.full_name(var), "nothing was prefetched")
            })?;
            return Ok((FetchState::FetchWhole, node, merged.clone()));
        }
        if let Some(node) = self.cache.lookup(var) {
            return Ok((FetchState::Cached, node, merged.clone()));
        }

        let fetch = strip_pseudo_dims(&self.dds, merged);
        let (state, walk) = if fetch.is_whole() {
            (FetchState::FetchWhole, merged.clone())
        } else {
            (FetchState::FetchPart, walk_projection(&self.dds, merged))
        };
        let constraint = Constraint::new(vec![fetch], self.url_constraint.selections.clone());
        let payload = self.fetch(Some(&constraint.to_string()))?;
        let node = self.cache.insert(CacheNode::new([var], payload, constraint));
        Ok((state, node, walk))
    }

    /// Fill the prefetch node, once, before the first request is served.
    fn ensure_prefetch(&mut self) -> Result<()> {
        if self.prefetched {
            return Ok(());
        }
        if self.prefetch_vars.is_empty() {
            self.prefetched = true;
            return Ok(());
        }

        // complete sibling sets are asked for by their container
        let constraint = Constraint::new(
            restrict(&self.dds, &self.prefetch_vars, &[]),
            self.url_constraint.selections.clone(),
        );
        let all = constraint.is_empty();
        let ce = (!all).then(|| constraint.to_string());
        debug!(vars = self.prefetch_vars.len(), all, "prefetching");
        let payload = self.fetch(ce.as_deref())?;
        self.cache.set_prefetch(CacheNode::prefetch(
            self.prefetch_vars.iter().copied(),
            payload,
            constraint,
        ));
        self.prefetched = true;
        Ok(())
    }

    /// One data request. Empty constraints, and any constraint to an unconstrainable source, are
    /// sent as no constraint at all.
    fn fetch(&self, constraint: Option<&str>) -> Result<Arc<dyn Payload>> {
        let constraint = constraint.filter(|c| self.constrainable && !c.is_empty());
        let started = Instant::now();
        let response = self.fetcher.fetch(constraint, FetchKind::DataDds)?;
        let elapsed = started.elapsed();
        if self.config.show_fetch {
            info!(url = %response.url, status = response.status, ?elapsed, "fetch");
        } else {
            debug!(url = %response.url, status = response.status, ?elapsed, "fetch");
        }
        Ok(response.into_payload()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncdap_constraint::{Constant, Operator, Segment, Selection, Slice, Value};
    use ncdap_test_helpers::{MOCK_URL, MockFetcher, fixtures};
    use pretty_assertions::assert_eq;

    fn config(prefetch: bool) -> CacheConfig {
        CacheConfig {
            prefetch,
            ..Default::default()
        }
    }

    fn names(dds: &Dds, vars: &[NodeId]) -> Vec<String> {
        vars.iter().map(|v| dds.full_name(*v)).collect()
    }

    #[test]
    fn prefetch_selection() {
        let dds = fixtures::dataset();
        let none = Constraint::default();
        assert_eq!(
            names(&dds, &mark_prefetch(&dds, &none, &config(true), true)),
            vec!["v", "t", "name", "s.a", "s.b"]
        );
        assert!(mark_prefetch(&dds, &none, &config(false), true).is_empty());

        let small = CacheConfig {
            small_size_limit: 6,
            ..config(true)
        };
        assert_eq!(
            names(&dds, &mark_prefetch(&dds, &none, &small, true)),
            vec!["t", "name", "s.b"]
        );

        let mut projected = Constraint::new(vec![Projection::path(["v"])], vec![]);
        map_constraint(&dds, &mut projected).unwrap();
        assert_eq!(
            names(&dds, &mark_prefetch(&dds, &projected, &config(true), true)),
            vec!["t", "name", "s.a", "s.b"]
        );

        // an unconstrainable source reads everything at once
        assert_eq!(
            mark_prefetch(&dds, &none, &config(false), false).len(),
            dds.variables().count()
        );
    }

    #[test]
    fn client_params_and_unconstrainable_sources() {
        let url = Url::parse("file:///data/ds.nc#cache=0&cachecount=7").unwrap();
        let constraint = Constraint::new(
            vec![Projection::path(["v"])],
            vec![Selection::new(
                PathVar::from_names(["obs", "id"]),
                Operator::Gt,
                vec![Value::Constant(Constant::Int(3))],
            )],
        );
        let session = Session::builder(url, fixtures::dataset(), Arc::new(MockFetcher::new()))
            .constraint(constraint)
            .build()
            .unwrap();
        assert!(!session.is_constrainable());
        assert!(session.config().cache);
        assert_eq!(session.config().cache_count, 7);
        assert!(session.url_constraint().is_empty());
        assert_eq!(session.prefetch_vars().len(), 7);
    }

    #[test]
    fn cache_off_retains_nothing() {
        let url = Url::parse(&format!("{MOCK_URL}#cache=no")).unwrap();
        let session = Session::builder(url, fixtures::dataset(), Arc::new(MockFetcher::new()))
            .build()
            .unwrap();
        assert!(!session.config().cache);
        assert_eq!(session.cache().count_budget(), 0);
    }

    #[test]
    fn standing_constraint_sets_the_shape() {
        let v = Segment::with_slices("v", vec![Slice::new(2, 2, 8)]);
        let constraint = Constraint::new(vec![Projection::Var(PathVar::new(vec![v]))], vec![]);
        let session = Session::builder(
            Url::parse(MOCK_URL).unwrap(),
            fixtures::dataset(),
            Arc::new(MockFetcher::new()),
        )
        .constraint(constraint)
        .build()
        .unwrap();
        assert_eq!(session.shape(&["v"]).unwrap(), vec![4]);
        assert_eq!(session.shape(&["name"]).unwrap(), vec![3, 8]);
        assert_eq!(session.url_constraint().to_string(), "v[2:2:8]");
    }

    #[derive(Debug)]
    struct NoDecoder;

    impl PayloadDecoder for NoDecoder {
        fn decode(
            &self,
            _kind: FetchKind,
            _body: &[u8],
        ) -> std::result::Result<Arc<dyn Payload>, Box<dyn std::error::Error + Send + Sync>>
        {
            Err("no decoder".into())
        }
    }

    #[test]
    fn http_transport_drops_client_params() {
        let url = Url::parse("http://example.com/ds.nc#cache=0&show=fetch").unwrap();
        let config = CacheConfig {
            fetch_timeout: Some(std::time::Duration::from_secs(5).into()),
            ..Default::default()
        };
        let fetcher = http_fetcher(&url, Arc::new(NoDecoder), &config).unwrap();
        assert_eq!(
            fetcher
                .request_url(Some("v[0:3]"), FetchKind::DataDds)
                .as_str(),
            "http://example.com/ds.nc.dods?v[0:3]"
        );
    }

    #[test]
    fn only_primitives_are_read() {
        let mut session = Session::builder(
            Url::parse(MOCK_URL).unwrap(),
            fixtures::dataset(),
            Arc::new(MockFetcher::new()),
        )
        .build()
        .unwrap();
        let err = session
            .get_values(&SubsetRequest::new("s"), NcType::Int)
            .unwrap_err();
        assert!(matches!(err, Error::NotAVariable { kind: NodeKind::Structure, .. }), "{err}");
    }
}
