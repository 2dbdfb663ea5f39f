mod calculate_margin;
mod extract_catalog_rows;
mod extract_item_data;
mod find_similar_items;
mod normalize_categories;
mod review_seo;
mod validate_import_headers;

pub use calculate_margin::CalculateMarginTool;
pub use extract_catalog_rows::ExtractCatalogRowsTool;
pub use extract_item_data::ExtractItemDataTool;
pub use find_similar_items::FindSimilarItemsTool;
pub use normalize_categories::{normalize_categories, NormalizeCategoriesTool};
pub use review_seo::ReviewSeoTool;
pub use validate_import_headers::{ValidateImportHeadersTool, REQUIRED_FIELDS};
