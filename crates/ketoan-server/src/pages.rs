//! The page table: every template-backed route the frontend serves.
//!
//! The router, the login redirect and the navigation menu all read from
//! [`Page`], so adding a screen means adding a variant here and a template
//! under `templates/`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Login,
    GeneralDiary,
    Products,
    ProductGroups,
    Prices,
    Orders,
    Invoices,
    Warehouse,
    Reports,
    AreasManagement,
    ShopsManagement,
    AccountManagement,
}

/// Pages that require a logged-in session, in menu order.
pub const PROTECTED_PAGES: [Page; 11] = [
    Page::GeneralDiary,
    Page::Products,
    Page::ProductGroups,
    Page::Prices,
    Page::Orders,
    Page::Invoices,
    Page::Warehouse,
    Page::Reports,
    Page::AreasManagement,
    Page::ShopsManagement,
    Page::AccountManagement,
];

impl Page {
    /// Page shown for `/`.
    pub const HOME: Page = Page::GeneralDiary;

    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::GeneralDiary => "/general-diary",
            Self::Products => "/products",
            Self::ProductGroups => "/product-groups",
            Self::Prices => "/prices",
            Self::Orders => "/orders",
            Self::Invoices => "/invoices",
            Self::Warehouse => "/warehouse",
            Self::Reports => "/reports",
            Self::AreasManagement => "/areas-management",
            Self::ShopsManagement => "/shops-management",
            Self::AccountManagement => "/account-management",
        }
    }

    /// Endpoint name, also used by templates to highlight the active menu entry.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::GeneralDiary => "general_diary",
            Self::Products => "products",
            Self::ProductGroups => "product_groups",
            Self::Prices => "prices",
            Self::Orders => "orders",
            Self::Invoices => "invoices",
            Self::Warehouse => "warehouse",
            Self::Reports => "reports",
            Self::AreasManagement => "areas_management",
            Self::ShopsManagement => "shops_management",
            Self::AccountManagement => "account_management",
        }
    }

    pub fn template(&self) -> String {
        format!("{}.html", self.key())
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Login => "Đăng nhập",
            Self::GeneralDiary => "Nhật ký chung",
            Self::Products => "Quản lý sản phẩm",
            Self::ProductGroups => "Quản lý nhóm sản phẩm",
            Self::Prices => "Quản lý bảng giá",
            Self::Orders => "Quản lý đơn hàng",
            Self::Invoices => "Quản lý hóa đơn",
            Self::Warehouse => "Quản lý kho hàng",
            Self::Reports => "Báo cáo",
            Self::AreasManagement => "Quản lý khu vực",
            Self::ShopsManagement => "Quản lý shop",
            Self::AccountManagement => "Quản lý tài khoản",
        }
    }

    pub fn requires_login(&self) -> bool {
        !matches!(self, Self::Login)
    }
}

/// Menu entry exposed to templates.
#[derive(Debug, Clone, Serialize)]
pub struct NavItem {
    pub key: &'static str,
    pub path: &'static str,
    pub title: &'static str,
}

pub fn navigation() -> Vec<NavItem> {
    PROTECTED_PAGES
        .iter()
        .map(|page| NavItem {
            key: page.key(),
            path: page.path(),
            title: page.title(),
        })
        .collect()
}
