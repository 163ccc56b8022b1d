pub mod admin_logs;
pub mod answers;
pub mod auth_histories;
pub mod banners;
pub mod baskets;
pub mod brands;
pub mod categories;
pub mod comments;
pub mod coupons;
pub mod forgot_passwords;
pub mod order_items;
pub mod orders;
pub mod payments;
pub mod products;
pub mod questions;
pub mod refresh_tokens;
pub mod roles;
pub mod transactions;
pub mod users;
pub mod website_informations;

pub use admin_logs::Entity as AdminLogs;
pub use answers::Entity as Answers;
pub use auth_histories::Entity as AuthHistories;
pub use banners::Entity as Banners;
pub use baskets::Entity as Baskets;
pub use brands::Entity as Brands;
pub use categories::Entity as Categories;
pub use comments::Entity as Comments;
pub use coupons::Entity as Coupons;
pub use forgot_passwords::Entity as ForgotPasswords;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use payments::Entity as Payments;
pub use products::Entity as Products;
pub use questions::Entity as Questions;
pub use refresh_tokens::Entity as RefreshTokens;
pub use roles::Entity as Roles;
pub use transactions::Entity as Transactions;
pub use users::Entity as Users;
pub use website_informations::Entity as WebsiteInformations;
