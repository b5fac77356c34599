pub mod clinical_trials;
pub mod pubmed;
pub mod traits;

pub use clinical_trials::ClinicalTrialsProvider;
pub use pubmed::PubMedProvider;
pub use traits::{
    LiteratureQuery, LiteratureSource, ProviderError, ProviderResult, SortMode, TrialQuery,
    TrialRegistry,
};
