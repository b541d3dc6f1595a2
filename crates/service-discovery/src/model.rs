//! Service designations: types, URLs, and query descriptions
//!
//! A [`ServiceType`] names a category of service (an abstract type such as
//! `ejb`, optionally pinned to a concrete URI scheme); a [`ServiceUrl`] is a
//! concrete advertisement (a location URI plus named, possibly multi-valued
//! attributes). Both are immutable value objects; discovery queries pair a
//! type with a filter and match it against advertised URLs.

use std::collections::BTreeSet;
use std::fmt;

use url::Url;

use crate::attribute::AttributeValue;
use crate::error::{Error, Result};
use crate::filter::{FilterSpec, MultiAttributeMap};

/// An abstract or concrete service category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceType {
    abstract_type: String,
    abstract_type_authority: Option<String>,
    uri_scheme: Option<String>,
    uri_scheme_authority: Option<String>,
}

impl ServiceType {
    /// An abstract service type with an optional naming authority.
    pub fn of(abstract_type: &str, abstract_type_authority: Option<&str>) -> ServiceType {
        ServiceType {
            abstract_type: abstract_type.to_string(),
            abstract_type_authority: abstract_type_authority.map(str::to_string),
            uri_scheme: None,
            uri_scheme_authority: None,
        }
    }

    /// Narrow this type to a concrete URI scheme.
    pub fn with_scheme(mut self, uri_scheme: &str, uri_scheme_authority: Option<&str>) -> ServiceType {
        self.uri_scheme = Some(uri_scheme.to_string());
        self.uri_scheme_authority = uri_scheme_authority.map(str::to_string);
        self
    }

    /// Get the abstract type.
    pub fn abstract_type(&self) -> &str {
        &self.abstract_type
    }

    /// Get the abstract type authority, if any.
    pub fn abstract_type_authority(&self) -> Option<&str> {
        self.abstract_type_authority.as_deref()
    }

    /// Get the concrete URI scheme, if any.
    pub fn uri_scheme(&self) -> Option<&str> {
        self.uri_scheme.as_deref()
    }

    /// Get the concrete URI scheme authority, if any.
    pub fn uri_scheme_authority(&self) -> Option<&str> {
        self.uri_scheme_authority.as_deref()
    }

    /// Determine whether this type implies the other type: the abstract
    /// parts must be equal, and a concrete scheme constrains the other's.
    pub fn implies(&self, other: &ServiceType) -> bool {
        self.abstract_type == other.abstract_type
            && self.abstract_type_authority == other.abstract_type_authority
            && match &self.uri_scheme {
                None => true,
                Some(scheme) => {
                    Some(scheme.as_str()) == other.uri_scheme.as_deref()
                        && self.uri_scheme_authority == other.uri_scheme_authority
                }
            }
    }

    /// Determine whether a service URL advertises this type.
    ///
    /// An abstract-only type matches the URL's abstract type when it has
    /// one, or its concrete scheme otherwise; a concrete type additionally
    /// requires the URL's scheme and scheme authority to match.
    pub fn implies_url(&self, service_url: &ServiceUrl) -> bool {
        match &self.uri_scheme {
            None => match service_url.abstract_type() {
                None => {
                    self.abstract_type == service_url.uri_scheme()
                        && self.abstract_type_authority.as_deref()
                            == service_url.uri_scheme_authority()
                }
                Some(abstract_type) => {
                    self.abstract_type == abstract_type
                        && self.abstract_type_authority.as_deref()
                            == service_url.abstract_type_authority()
                }
            },
            Some(scheme) => {
                Some(self.abstract_type.as_str()) == service_url.abstract_type()
                    && self.abstract_type_authority.as_deref()
                        == service_url.abstract_type_authority()
                    && scheme == service_url.uri_scheme()
                    && self.uri_scheme_authority.as_deref() == service_url.uri_scheme_authority()
            }
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service:{}", self.abstract_type)?;
        if let Some(authority) = &self.abstract_type_authority {
            write!(f, ".{authority}")?;
        }
        if let Some(scheme) = &self.uri_scheme {
            write!(f, ":{scheme}")?;
            if let Some(authority) = &self.uri_scheme_authority {
                write!(f, ".{authority}")?;
            }
        }
        Ok(())
    }
}

/// A concrete service advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceUrl {
    abstract_type: Option<String>,
    abstract_type_authority: Option<String>,
    location: Url,
    uri_scheme_authority: Option<String>,
    attributes: MultiAttributeMap,
}

impl ServiceUrl {
    /// Start building a service URL.
    pub fn builder() -> ServiceUrlBuilder {
        ServiceUrlBuilder::default()
    }

    /// Get the abstract type, if any.
    pub fn abstract_type(&self) -> Option<&str> {
        self.abstract_type.as_deref()
    }

    /// Get the abstract type authority, if any.
    pub fn abstract_type_authority(&self) -> Option<&str> {
        self.abstract_type_authority.as_deref()
    }

    /// Get the concrete location URI.
    pub fn location(&self) -> &Url {
        &self.location
    }

    /// Get the concrete URI scheme.
    pub fn uri_scheme(&self) -> &str {
        self.location.scheme()
    }

    /// Get the concrete URI scheme authority, if any.
    pub fn uri_scheme_authority(&self) -> Option<&str> {
        self.uri_scheme_authority.as_deref()
    }

    /// Get the host name of the location, if any.
    pub fn host(&self) -> Option<&str> {
        self.location.host_str()
    }

    /// Get the port of the location, if any.
    pub fn port(&self) -> Option<u16> {
        self.location.port()
    }

    /// Get the path of the location.
    pub fn path(&self) -> &str {
        self.location.path()
    }

    /// Get the service type of this URL: the abstract type when present,
    /// otherwise the concrete scheme.
    pub fn service_type(&self) -> ServiceType {
        match &self.abstract_type {
            Some(abstract_type) => ServiceType {
                abstract_type: abstract_type.clone(),
                abstract_type_authority: self.abstract_type_authority.clone(),
                uri_scheme: Some(self.uri_scheme().to_string()),
                uri_scheme_authority: self.uri_scheme_authority.clone(),
            },
            None => ServiceType {
                abstract_type: self.uri_scheme().to_string(),
                abstract_type_authority: self.uri_scheme_authority.clone(),
                uri_scheme: None,
                uri_scheme_authority: None,
            },
        }
    }

    /// Iterate over the attribute names.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Collect the attribute names into a set suitable for pre-filtering.
    pub fn attribute_name_set(&self) -> BTreeSet<String> {
        self.attributes.keys().cloned().collect()
    }

    /// Get all values of the named attribute; empty if absent.
    pub fn attribute_values(&self, name: &str) -> &[AttributeValue] {
        self.attributes.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Get the first value of the named attribute.
    pub fn first_attribute_value(&self, name: &str) -> Option<&AttributeValue> {
        self.attribute_values(name).first()
    }

    /// Get the last value of the named attribute.
    pub fn last_attribute_value(&self, name: &str) -> Option<&AttributeValue> {
        self.attribute_values(name).last()
    }

    /// Access the full attribute map.
    pub fn attributes(&self) -> &MultiAttributeMap {
        &self.attributes
    }

    /// Determine whether this URL satisfies the given filter.
    ///
    /// An absent filter matches everything.
    pub fn satisfies(&self, filter_spec: Option<&FilterSpec>) -> bool {
        filter_spec.is_none_or(|f| f.matches_multi(&self.attributes))
    }

    /// Determine whether this URL implies the other; true only on equality.
    pub fn implies(&self, other: &ServiceUrl) -> bool {
        self == other
    }

    /// Render this URL as a `service:` URI.
    pub fn to_service_uri(&self) -> Result<Url> {
        Url::parse(&self.to_string()).map_err(|e| Error::InvalidUri(e.to_string()))
    }
}

impl fmt::Display for ServiceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("service:")?;
        if let Some(abstract_type) = &self.abstract_type {
            f.write_str(abstract_type)?;
            if let Some(authority) = &self.abstract_type_authority {
                write!(f, ".{authority}")?;
            }
            f.write_str(":")?;
        }
        f.write_str(self.uri_scheme())?;
        if let Some(authority) = &self.uri_scheme_authority {
            write!(f, ".{authority}")?;
        }
        let raw = self.location.as_str();
        write!(f, ":{}", &raw[self.uri_scheme().len() + 1..])?;
        for (name, values) in &self.attributes {
            write!(f, ";{name}")?;
            let mut values = values.iter();
            if let Some(first) = values.next() {
                write!(f, "={first}")?;
                for value in values {
                    write!(f, ",{value}")?;
                }
            }
        }
        Ok(())
    }
}

/// A builder for [`ServiceUrl`] values.
#[derive(Debug, Clone, Default)]
pub struct ServiceUrlBuilder {
    abstract_type: Option<String>,
    abstract_type_authority: Option<String>,
    location: Option<Url>,
    uri_scheme_authority: Option<String>,
    attributes: MultiAttributeMap,
}

impl From<&ServiceUrl> for ServiceUrlBuilder {
    /// Seed a builder from an existing service URL.
    fn from(original: &ServiceUrl) -> ServiceUrlBuilder {
        ServiceUrlBuilder {
            abstract_type: original.abstract_type.clone(),
            abstract_type_authority: original.abstract_type_authority.clone(),
            location: Some(original.location.clone()),
            uri_scheme_authority: original.uri_scheme_authority.clone(),
            attributes: original.attributes.clone(),
        }
    }
}

impl ServiceUrlBuilder {
    /// Set the concrete location URI.
    pub fn uri(mut self, uri: Url) -> Self {
        self.location = Some(uri);
        self
    }

    /// Set the abstract type.
    pub fn abstract_type(mut self, abstract_type: impl Into<String>) -> Self {
        self.abstract_type = Some(abstract_type.into());
        self
    }

    /// Set the abstract type authority.
    pub fn abstract_type_authority(mut self, authority: impl Into<String>) -> Self {
        self.abstract_type_authority = Some(authority.into());
        self
    }

    /// Set the URI scheme authority.
    pub fn uri_scheme_authority(mut self, authority: impl Into<String>) -> Self {
        self.uri_scheme_authority = Some(authority.into());
        self
    }

    /// Add an attribute value. Duplicate values of one attribute collapse.
    pub fn attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        let values = self.attributes.entry(name.into()).or_default();
        if !values.contains(&value) {
            values.push(value);
        }
        self
    }

    /// Add a valueless attribute, which matches presence filters only.
    pub fn flag_attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.entry(name.into()).or_default();
        self
    }

    /// Remove all values of the given attribute name.
    pub fn remove_attribute(mut self, name: &str) -> Self {
        self.attributes.remove(name);
        self
    }

    /// Construct the service URL.
    ///
    /// The location URI is required and may not carry a fragment; an empty
    /// query is normalized away, and an abstract type authority is retained
    /// only alongside an abstract type.
    pub fn build(self) -> Result<ServiceUrl> {
        let mut location = self
            .location
            .ok_or_else(|| Error::InvalidUri("location URI is required".to_string()))?;
        if location.fragment().is_some_and(|f| !f.is_empty()) {
            return Err(Error::InvalidUri(format!(
                "service URI {location} may not have a fragment"
            )));
        }
        if location.fragment().is_some() {
            location.set_fragment(None);
        }
        if location.query() == Some("") {
            location.set_query(None);
        }
        Ok(ServiceUrl {
            abstract_type_authority: self
                .abstract_type
                .is_some()
                .then_some(self.abstract_type_authority)
                .flatten(),
            abstract_type: self.abstract_type,
            location,
            uri_scheme_authority: self.uri_scheme_authority,
            attributes: self.attributes,
        })
    }
}

/// A service type paired with a filter, describing one discoverable service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceDescription {
    service_type: ServiceType,
    filter_spec: FilterSpec,
}

impl ServiceDescription {
    /// Construct a new instance.
    pub fn new(service_type: ServiceType, filter_spec: FilterSpec) -> ServiceDescription {
        ServiceDescription {
            service_type,
            filter_spec,
        }
    }

    /// Get the service type.
    pub fn service_type(&self) -> &ServiceType {
        &self.service_type
    }

    /// Get the filter specification.
    pub fn filter_spec(&self) -> &FilterSpec {
        &self.filter_spec
    }
}

impl fmt::Display for ServiceDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.service_type, self.filter_spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_url() -> ServiceUrl {
        ServiceUrl::builder()
            .uri(Url::parse("http://myhost.com").unwrap())
            .abstract_type("ejb")
            .abstract_type_authority("jboss")
            .attribute("cluster", AttributeValue::from_string("c"))
            .build()
            .unwrap()
    }

    #[test]
    fn type_implies_url() {
        let url = sample_url();
        assert!(ServiceType::of("ejb", Some("jboss")).implies_url(&url));
        assert!(!ServiceType::of("ejb", None).implies_url(&url));
        assert!(!ServiceType::of("jms", Some("jboss")).implies_url(&url));
        assert!(
            ServiceType::of("ejb", Some("jboss"))
                .with_scheme("http", None)
                .implies_url(&url)
        );
        assert!(
            !ServiceType::of("ejb", Some("jboss"))
                .with_scheme("https", None)
                .implies_url(&url)
        );

        // a URL without an abstract type matches through its scheme
        let bare = ServiceUrl::builder()
            .uri(Url::parse("http://myhost.com").unwrap())
            .build()
            .unwrap();
        assert!(ServiceType::of("http", None).implies_url(&bare));
        assert!(!ServiceType::of("ejb", None).implies_url(&bare));
    }

    #[test]
    fn type_implies_type() {
        let abstract_only = ServiceType::of("ejb", Some("jboss"));
        let concrete = ServiceType::of("ejb", Some("jboss")).with_scheme("http", None);
        assert!(abstract_only.implies(&concrete));
        assert!(!concrete.implies(&abstract_only));
        assert!(concrete.implies(&concrete));
    }

    #[test]
    fn display_forms() {
        assert_eq!(
            ServiceType::of("ejb", Some("jboss")).to_string(),
            "service:ejb.jboss"
        );
        assert_eq!(
            ServiceType::of("ejb", Some("jboss"))
                .with_scheme("http", None)
                .to_string(),
            "service:ejb.jboss:http"
        );
        assert_eq!(
            sample_url().to_string(),
            "service:ejb.jboss:http://myhost.com/;cluster=c"
        );
    }

    #[test]
    fn builder_validation() {
        let err = ServiceUrl::builder().build().unwrap_err();
        assert!(matches!(err, Error::InvalidUri(_)));

        let err = ServiceUrl::builder()
            .uri(Url::parse("http://h/#frag").unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUri(_)));

        // authority without an abstract type is dropped
        let url = ServiceUrl::builder()
            .uri(Url::parse("http://h/").unwrap())
            .abstract_type_authority("jboss")
            .build()
            .unwrap();
        assert_eq!(url.abstract_type_authority(), None);
    }

    #[test]
    fn attribute_access() {
        let url = ServiceUrl::builder()
            .uri(Url::parse("http://h/").unwrap())
            .attribute("a", AttributeValue::from_int(1))
            .attribute("a", AttributeValue::from_int(2))
            .attribute("a", AttributeValue::from_int(1))
            .flag_attribute("flag")
            .build()
            .unwrap();
        assert_eq!(url.attribute_values("a").len(), 2);
        assert_eq!(
            url.first_attribute_value("a"),
            Some(&AttributeValue::from_int(1))
        );
        assert_eq!(
            url.last_attribute_value("a"),
            Some(&AttributeValue::from_int(2))
        );
        assert!(url.attribute_values("flag").is_empty());
        assert!(url.satisfies(Some(&FilterSpec::has_attribute("flag"))));
        assert!(url.satisfies(None));
        assert!(!url.satisfies(Some(&FilterSpec::equal("flag", "x"))));
    }

    #[test]
    fn service_type_of_url() {
        let url = sample_url();
        assert_eq!(url.service_type().abstract_type(), "ejb");
        assert_eq!(url.service_type().uri_scheme(), Some("http"));
        let bare = ServiceUrl::builder()
            .uri(Url::parse("remote+http://h:8080").unwrap())
            .build()
            .unwrap();
        assert_eq!(bare.service_type().abstract_type(), "remote+http");
        assert_eq!(bare.service_type().uri_scheme(), None);
    }
}
