/// Defines a numeric identifier newtype for a backend resource.
///
/// # Syntax
/// ```ignore
/// define_id!("resource name", IdType);
/// ```
///
/// The generated type is transparent on the wire, prints as the bare number and parses
/// from a decimal string, which is how the REPL and the URL builders consume it.
///
/// # Example
///
/// ```ignore
/// define_id!("content", ContentId);
///
/// let id: ContentId = "42".parse()?;
/// assert_eq!(format!("/courses/content/{id}/progress"), "/courses/content/42/progress");
/// ```
#[macro_export]
macro_rules! define_id {
    ($resource:literal, $id:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $id(pub u64);

        impl ::std::fmt::Display for $id {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::std::str::FromStr for $id {
            type Err = $crate::model::ParseId;

            fn from_str(input: &str) -> Result<Self, Self::Err> {
                input
                    .trim()
                    .parse()
                    .map($id)
                    .map_err(|_| $crate::model::ParseId::new($resource, input.to_string()))
            }
        }

        impl From<u64> for $id {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}
