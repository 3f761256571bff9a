//! Built-in workflow catalog
//!
//! E-commerce integration flows against the accounting API: product setup,
//! order processing, invoicing, payments, purchasing and dropshipping.

use chrono::{Duration, Local, NaiveDate};
use serde_json::json;

use super::model::{
    FieldDescriptor as Field, FieldKind, InfoBox, InfoKind, LocalizedText as L, Scenario, Step, Workflow,
};
use super::Catalog;

/// Build the built-in catalog with template dates relative to today
pub fn builtin_catalog() -> Catalog {
    builtin_catalog_at(Local::now().date_naive())
}

/// Build the built-in catalog with template dates relative to `today`
pub fn builtin_catalog_at(today: NaiveDate) -> Catalog {
    let dates = TemplateDates::new(today);
    Catalog::from_trusted(vec![
        product_setup(),
        order_processing(&dates),
        invoice_creation(&dates),
        payment_processing(&dates),
        purchase_restock(&dates),
        dropshipping(&dates),
    ])
}

struct TemplateDates {
    today: String,
    in_week: String,
    in_month: String,
}

impl TemplateDates {
    fn new(today: NaiveDate) -> Self {
        let fmt = |d: NaiveDate| d.format("%Y-%m-%d").to_string();
        Self {
            today: fmt(today),
            in_week: fmt(today + Duration::days(7)),
            in_month: fmt(today + Duration::days(30)),
        }
    }
}

fn scenario(id: &str, ar: &str, en: &str) -> Scenario {
    Scenario { id: id.to_string(), label: L::new(ar, en), icon: None }
}

fn payment_fields(wrapper: &str, target: &str, target_ar: &str, target_en: &str, source: &str) -> Vec<Field> {
    vec![
        Field::text(&format!("{wrapper}.reference"), "رقم المرجع", "Reference (Unique)").required(),
        Field::select(&format!("{wrapper}.{target}"), target_ar, target_en, source).required(),
        Field::select(&format!("{wrapper}.account_id"), "الحساب", "Account", "accounts").required(),
        Field::date(&format!("{wrapper}.date"), "تاريخ الدفع", "Payment Date").required(),
        Field::number(&format!("{wrapper}.amount"), "المبلغ", "Amount").required(),
    ]
}

fn sales_invoice_fields(reference_hint: Option<(&str, &str)>, reference_ar: &str, reference_en: &str) -> Vec<Field> {
    let mut reference = Field::text("invoice.reference", reference_ar, reference_en);
    if let Some((ar, en)) = reference_hint {
        reference = reference.hint(ar, en);
    }
    vec![
        Field::select("invoice.contact_id", "العميل", "Customer", "customers").required(),
        Field::date("invoice.issue_date", "تاريخ الإصدار", "Issue Date").required(),
        Field::date("invoice.due_date", "تاريخ الاستحقاق", "Due Date").required(),
        Field::select("invoice.status", "الحالة", "Status", "statuses").required(),
        Field::select("invoice.inventory_id", "المخزن", "Inventory", "inventories").required(),
        reference,
        Field::line_items("invoice.line_items", "بنود الفاتورة", "Line Items"),
    ]
}

fn product_setup() -> Workflow {
    Workflow {
        id: "product-setup".to_string(),
        name: L::new("إعداد المنتجات", "Product Setup"),
        description: L::new(
            "إنشاء وربط المنتجات بين المتجر الإلكتروني وقيود",
            "Create and sync products between e-commerce store and Qoyod",
        ),
        scenarios: vec![
            scenario("tracked", "منتج بمخزون", "Tracked Inventory"),
            scenario("untracked", "خدمة/دروب شوبينج", "Service/Dropshipping"),
        ],
        info: None,
        steps: vec![
            Step::new("fetch-categories", L::new("جلب التصنيفات", "Fetch Categories"), "GET", "/categories")
                .describe(L::new("جلب قائمة تصنيفات المنتجات المتاحة", "Fetch available product categories")),
            Step::new("fetch-units", L::new("جلب وحدات القياس", "Fetch Units"), "GET", "/product_unit_types")
                .describe(L::new("جلب وحدات القياس المتاحة", "Fetch available measurement units")),
            Step::new("fetch-inventories", L::new("جلب المخازن", "Fetch Inventories"), "GET", "/inventories")
                .describe(L::new(
                    "جلب قائمة المخازن المتاحة (للمنتجات المتتبعة)",
                    "Fetch available inventories (for tracked products)",
                ))
                .when("tracked"),
            Step::new("create-product", L::new("إنشاء المنتج", "Create Product"), "POST", "/products")
                .describe(L::new("إنشاء المنتج في قيود", "Create product in Qoyod"))
                .body(json!({
                    "product": {
                        "sku": "PROD-001",
                        "name_ar": "اسم المنتج",
                        "name_en": "Product Name",
                        "product_unit_type_id": 1,
                        "category_id": 1,
                        "tax_id": 1,
                        "sale_item": 1,
                        "selling_price": 100,
                        "sales_account_id": null,
                        "purchase_item": 1,
                        "buying_price": 50,
                        "purchase_account_id": null,
                        "cogs_account_id": null,
                        "track_quantity": true,
                        "description": ""
                    }
                }))
                .fields(vec![
                    Field::text("product.sku", "رمز المنتج (SKU)", "SKU (Unique)").required(),
                    Field::text("product.name_ar", "اسم المنتج (عربي)", "Product Name (Arabic)").required(),
                    Field::text("product.name_en", "اسم المنتج (إنجليزي)", "Product Name (English)").required(),
                    Field::select("product.product_unit_type_id", "الوحدة", "Unit", "units").required(),
                    Field::select("product.category_id", "التصنيف", "Category", "categories").required(),
                    Field::select("product.tax_id", "الضريبة", "Tax", "taxes").required(),
                    Field::select("product.sales_account_id", "حساب المبيعات", "Sales Account", "accounts").required(),
                    Field::select("product.purchase_account_id", "حساب المشتريات", "Purchase Account", "accounts").required(),
                    Field::select("product.cogs_account_id", "حساب التكلفة", "COGS Account", "accounts").required(),
                    Field::number("product.selling_price", "سعر البيع", "Selling Price").required(),
                    Field::number("product.buying_price", "سعر الشراء", "Buying Price").required(),
                    Field::of_kind("product.track_quantity", FieldKind::Checkbox, "تتبع المخزون", "Track Inventory"),
                    Field::of_kind("product.description", FieldKind::Textarea, "الوصف", "Description"),
                ]),
        ],
    }
}

fn order_processing(dates: &TemplateDates) -> Workflow {
    Workflow {
        id: "order-processing".to_string(),
        name: L::new("معالجة الطلبات", "Order Processing"),
        description: L::new(
            "معالجة طلب جديد من المتجر وإنشاء الفاتورة",
            "Process new order from store and create invoice",
        ),
        scenarios: vec![
            scenario("existing-customer", "عميل موجود", "Existing Customer"),
            scenario("new-customer", "عميل جديد", "New Customer"),
            scenario("cash-customer", "عميل نقدي", "Cash Customer"),
        ],
        info: None,
        steps: vec![
            Step::new("search-customer", L::new("البحث عن العميل", "Search Customer"), "GET", "/customers")
                .describe(L::new("البحث عن العميل بالبريد الإلكتروني", "Search for customer by email"))
                .query("q[email_eq]", ""),
            Step::new("create-customer", L::new("إنشاء عميل جديد", "Create Customer"), "POST", "/customers")
                .describe(L::new("إنشاء عميل جديد (إذا لم يكن موجوداً)", "Create new customer (if not exists)"))
                .when("new-customer")
                .body(json!({
                    "contact": {
                        "name": "اسم العميل",
                        "email": "customer@example.com",
                        "phone": "0501234567",
                        "vat_number": "",
                        "address": "",
                        "city": "الرياض",
                        "country": "SA"
                    }
                }))
                .fields(vec![
                    Field::text("contact.name", "اسم العميل", "Customer Name").required(),
                    Field::of_kind("contact.email", FieldKind::Email, "البريد الإلكتروني", "Email"),
                    Field::of_kind("contact.phone", FieldKind::Tel, "رقم الهاتف", "Phone"),
                    Field::text("contact.vat_number", "الرقم الضريبي", "VAT Number")
                        .hint("مطلوب للفاتورة الضريبية B2B", "Required for B2B tax invoice"),
                    Field::text("contact.address", "العنوان", "Address"),
                    Field::text("contact.city", "المدينة", "City"),
                ]),
            Step::new("fetch-products", L::new("جلب قائمة المنتجات", "Fetch All Products"), "GET", "/products?limit=100")
                .describe(L::new(
                    "جلب جميع المنتجات المتاحة لاستخدامها في الفواتير",
                    "Fetch all available products for use in invoices",
                )),
            Step::new("create-invoice", L::new("إنشاء الفاتورة", "Create Invoice"), "POST", "/invoices")
                .describe(L::new("إنشاء فاتورة المبيعات", "Create sales invoice"))
                .body(json!({
                    "invoice": {
                        "contact_id": 1,
                        "issue_date": dates.today,
                        "due_date": dates.in_week,
                        "status": "Approved",
                        "inventory_id": 1,
                        "reference": "ORD-001",
                        "description": "طلب من المتجر الإلكتروني",
                        "line_items": [
                            { "product_id": 1, "quantity": 1, "unit_price": 100 }
                        ]
                    }
                }))
                .fields(sales_invoice_fields(None, "رقم المرجع", "Reference")),
        ],
    }
}

fn invoice_creation(dates: &TemplateDates) -> Workflow {
    let mut fields = sales_invoice_fields(
        Some(("رقم الطلب من المتجر", "Order number from store")),
        "رقم المرجع",
        "Reference",
    );
    if let Some(status) = fields.iter_mut().find(|f| f.path == "invoice.status") {
        *status = status.clone().hint("Draft أو Approved", "Draft or Approved");
    }

    Workflow {
        id: "invoice-creation".to_string(),
        name: L::new("إصدار الفواتير", "Invoice Creation"),
        description: L::new("إصدار فواتير متوافقة مع هيئة الزكاة والدخل", "Create ZATCA-compliant invoices"),
        scenarios: vec![
            Scenario {
                id: "standard".to_string(),
                label: L::new("فاتورة ضريبية (B2B)", "Standard Tax Invoice (B2B)"),
                icon: Some("🏢".to_string()),
            },
            Scenario {
                id: "simplified".to_string(),
                label: L::new("فاتورة مبسطة (B2C)", "Simplified Invoice (B2C)"),
                icon: Some("🛒".to_string()),
            },
        ],
        info: Some(InfoBox {
            kind: InfoKind::Note,
            title: L::new("متطلبات ZATCA", "ZATCA Requirements"),
            text: L::new(
                "قيود يدعم الفوترة الإلكترونية المرحلة الثانية. يتم إنشاء رمز QR والختم التشفيري تلقائياً.",
                "Qoyod supports Phase 2 e-invoicing. QR code and cryptographic stamp are generated automatically.",
            ),
        }),
        steps: vec![
            Step::new(
                "fetch-customers",
                L::new("جلب العملاء والمخازن", "Fetch Customers & Inventories"),
                "GET",
                "/customers",
            )
            .describe(L::new("جلب قائمة العملاء والمخازن المتاحة", "Fetch available customers and inventories")),
            Step::new("create-invoice", L::new("إنشاء الفاتورة", "Create Invoice"), "POST", "/invoices")
                .describe(L::new("إنشاء الفاتورة مع البنود", "Create invoice with line items"))
                .body(json!({
                    "invoice": {
                        "contact_id": 1,
                        "issue_date": dates.today,
                        "due_date": dates.in_week,
                        "status": "Approved",
                        "inventory_id": 1,
                        "reference": "INV-001",
                        "description": "",
                        "line_items": [
                            { "product_id": 1, "quantity": 1, "unit_price": 100 }
                        ]
                    }
                }))
                .fields(fields),
        ],
    }
}

fn payment_processing(dates: &TemplateDates) -> Workflow {
    Workflow {
        id: "payment-processing".to_string(),
        name: L::new("تحصيل المدفوعات", "Payment Processing"),
        description: L::new("تسجيل المدفوعات على الفواتير", "Record payments on invoices"),
        scenarios: vec![
            scenario("full", "سداد كامل", "Full Payment"),
            scenario("partial", "سداد جزئي", "Partial Payment"),
        ],
        info: None,
        steps: vec![
            Step::new("unpaid-invoices", L::new("جلب الفواتير غير المسددة", "Get Unpaid Invoices"), "GET", "/invoices")
                .describe(L::new("جلب الفواتير التي لم يتم سدادها بالكامل", "Get invoices not fully paid"))
                .query("q[status_eq]", "unpaid"),
            Step::new("fetch-accounts", L::new("جلب الحسابات", "Get Accounts"), "GET", "/accounts")
                .describe(L::new("جلب حسابات البنك والصندوق", "Get bank and cash accounts")),
            Step::new("record-payment", L::new("تسجيل الدفعة", "Record Payment"), "POST", "/invoice_payments")
                .describe(L::new("تسجيل الدفعة على الفاتورة", "Record payment on invoice"))
                .body(json!({
                    "invoice_payment": {
                        "reference": "PAY-001",
                        "invoice_id": 1,
                        "account_id": 1,
                        "date": dates.today,
                        "amount": 100
                    }
                }))
                .fields(payment_fields("invoice_payment", "invoice_id", "الفاتورة", "Invoice", "invoices")),
        ],
    }
}

fn purchase_restock(dates: &TemplateDates) -> Workflow {
    Workflow {
        id: "purchase-restock".to_string(),
        name: L::new("أوامر الشراء", "Purchase & Restock"),
        description: L::new("إنشاء أوامر شراء وإعادة التخزين", "Create purchase orders and restock inventory"),
        scenarios: Vec::new(),
        info: None,
        steps: vec![
            Step::new("fetch-vendors", L::new("جلب الموردين", "Get Vendors"), "GET", "/vendors")
                .describe(L::new("جلب قائمة الموردين", "Get list of vendors")),
            Step::new("fetch-products", L::new("جلب المنتجات", "Fetch Products"), "GET", "/products?limit=100")
                .describe(L::new("جلب المنتجات المتاحة", "Fetch available products")),
            Step::new("create-purchase-order", L::new("إنشاء أمر شراء", "Create Purchase Order"), "POST", "/orders")
                .describe(L::new("إنشاء أمر شراء للمورد", "Create purchase order for vendor"))
                .body(json!({
                    "order": {
                        "contact_id": 1,
                        "issue_date": dates.today,
                        "expiry_date": dates.in_week,
                        "status": "Draft",
                        "inventory_id": 1,
                        "reference": "PO-001",
                        "description": "",
                        "line_items": [
                            {
                                "product_id": 1,
                                "quantity": 10,
                                "unit_price": 50,
                                "inventory_id": 1,
                                "tax_percent": 15,
                                "discount": 0,
                                "discount_type": "percentage",
                                "description": "Product Description"
                            }
                        ]
                    }
                }))
                .fields(vec![
                    Field::select("order.contact_id", "المورد", "Vendor", "vendors").required(),
                    Field::select("order.inventory_id", "المخزن", "Inventory", "inventories").required(),
                    Field::date("order.issue_date", "تاريخ الإصدار", "Issue Date").required(),
                    Field::date("order.expiry_date", "تاريخ الانتهاء", "Expiry Date").required(),
                    Field::select("order.status", "الحالة", "Status", "statuses").required(),
                    Field::text("order.reference", "رقم المرجع", "Reference"),
                    Field::line_items("order.line_items", "بنود الشراء", "Line Items"),
                ]),
            Step::new("create-bill", L::new("إنشاء فاتورة المشتريات", "Create Bill"), "POST", "/bills")
                .describe(L::new("إنشاء فاتورة عند استلام البضاعة", "Create bill when goods received"))
                .body(json!({
                    "bill": {
                        "contact_id": 1,
                        "status": "Approved",
                        "issue_date": dates.today,
                        "due_date": dates.in_month,
                        "inventory_id": 1,
                        "reference": "BILL-001",
                        "line_items": [
                            { "product_id": 1, "quantity": 10, "unit_price": 50 }
                        ]
                    }
                }))
                .fields(vec![
                    Field::select("bill.contact_id", "المورد", "Vendor", "vendors").required(),
                    Field::select("bill.status", "الحالة", "Status", "statuses").required(),
                    Field::date("bill.issue_date", "تاريخ الإصدار", "Issue Date").required(),
                    Field::date("bill.due_date", "تاريخ الاستحقاق", "Due Date").required(),
                    Field::select("bill.inventory_id", "المخزن", "Inventory", "inventories").required(),
                    Field::line_items("bill.line_items", "بنود الفاتورة", "Line Items"),
                ]),
            Step::new("pay-bill", L::new("سداد الفاتورة", "Pay Bill"), "POST", "/bill_payments")
                .describe(L::new("تسجيل سداد الفاتورة للمورد", "Record bill payment to vendor"))
                .body(json!({
                    "bill_payment": {
                        "reference": "BPAY-001",
                        "bill_id": 1,
                        "account_id": 1,
                        "date": dates.today,
                        "amount": 500
                    }
                }))
                .fields(payment_fields("bill_payment", "bill_id", "الفاتورة", "Bill", "bills")),
        ],
    }
}

fn dropshipping(dates: &TemplateDates) -> Workflow {
    Workflow {
        id: "dropshipping".to_string(),
        name: L::new("دروب شوبينج", "Dropshipping"),
        description: L::new(
            "معالجة طلبات الدروب شوبينج بدون تتبع المخزون",
            "Process dropshipping orders without inventory tracking",
        ),
        scenarios: Vec::new(),
        info: Some(InfoBox {
            kind: InfoKind::Note,
            title: L::new("ملاحظة مهمة", "Important Note"),
            text: L::new(
                "في الدروب شوبينج، المنتجات تُنشأ بدون تتبع المخزون (track_quantity: false). يتم تسجيل تكلفة المورد كفاتورة مبسطة.",
                "In dropshipping, products are created without inventory tracking (track_quantity: false). Supplier cost is recorded as simple bill.",
            ),
        }),
        steps: vec![
            Step::new("create-sales-invoice", L::new("إنشاء فاتورة المبيعات", "Create Sales Invoice"), "POST", "/invoices")
                .describe(L::new(
                    "إنشاء فاتورة للعميل (بدون التحقق من المخزون)",
                    "Create customer invoice (no inventory check)",
                ))
                .body(json!({
                    "invoice": {
                        "contact_id": 1,
                        "issue_date": dates.today,
                        "due_date": dates.in_week,
                        "status": "Approved",
                        "inventory_id": 1,
                        "reference": "DS-ORD-001",
                        "description": "طلب دروب شوبينج",
                        "line_items": [
                            { "product_id": 1, "quantity": 1, "unit_price": 150 }
                        ]
                    }
                }))
                .fields(sales_invoice_fields(None, "رقم الطلب", "Order Number")),
            Step::new("record-supplier-cost", L::new("تسجيل تكلفة المورد", "Record Supplier Cost"), "POST", "/simple_bills")
                .describe(L::new("تسجيل تكلفة البضاعة المباعة كفاتورة مبسطة", "Record COGS as simple bill"))
                .body(json!({
                    "simple_bill": {
                        "contact_id": 1,
                        "status": "Approved",
                        "issue_date": dates.today,
                        "inventory_id": 1,
                        "reference": "DS-COST-001",
                        "simple_bill_items_attributes": [
                            { "expense_category_id": 1, "total_amount": 100, "tax_id": 1 }
                        ]
                    }
                }))
                .fields(vec![
                    Field::select("simple_bill.contact_id", "المورد", "Vendor", "vendors").required(),
                    Field::select("simple_bill.status", "الحالة", "Status", "statuses").required(),
                    Field::date("simple_bill.issue_date", "التاريخ", "Date").required(),
                    Field::select("simple_bill.inventory_id", "المخزن", "Inventory", "inventories").required(),
                    Field::text("simple_bill.reference", "رقم طلب المورد", "Supplier Order #"),
                    Field::select(
                        "simple_bill.simple_bill_items_attributes[0].expense_category_id",
                        "حساب المصروفات",
                        "Expense Account",
                        "accounts",
                    )
                    .required(),
                    Field::number(
                        "simple_bill.simple_bill_items_attributes[0].total_amount",
                        "تكلفة المورد",
                        "Supplier Cost",
                    )
                    .required(),
                ]),
            Step::new(
                "record-customer-payment",
                L::new("تسجيل دفعة العميل", "Record Customer Payment"),
                "POST",
                "/invoice_payments",
            )
            .describe(L::new("تسجيل استلام الدفعة من العميل", "Record payment received from customer"))
            .body(json!({
                "invoice_payment": {
                    "reference": "DS-PAY-001",
                    "invoice_id": 1,
                    "account_id": 1,
                    "date": dates.today,
                    "amount": 150
                }
            }))
            .fields(payment_fields("invoice_payment", "invoice_id", "الفاتورة", "Invoice", "invoices")),
            Step::new("pay-supplier", L::new("سداد المورد", "Pay Supplier"), "POST", "/simple_bill_payments")
                .describe(L::new("سداد تكلفة المورد", "Pay supplier cost"))
                .body(json!({
                    "simple_bill_payment": {
                        "reference": "DS-SPAY-001",
                        "simple_bill_id": 1,
                        "account_id": 1,
                        "date": dates.today,
                        "amount": 100
                    }
                }))
                .fields(payment_fields(
                    "simple_bill_payment",
                    "simple_bill_id",
                    "الفاتورة المبسطة",
                    "Simple Bill",
                    "simple_bills",
                )),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::path::FieldPath;

    fn fixed_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 10).unwrap()
    }

    #[test]
    fn test_catalog_ids_in_order() {
        let catalog = builtin_catalog_at(fixed_day());
        let ids: Vec<&str> = catalog.workflows().iter().map(|w| w.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "product-setup",
                "order-processing",
                "invoice-creation",
                "payment-processing",
                "purchase-restock",
                "dropshipping"
            ]
        );
    }

    #[test]
    fn test_template_dates() {
        let catalog = builtin_catalog_at(fixed_day());
        let step = catalog.get("order-processing").unwrap().step("create-invoice").unwrap();
        let body = step.body.as_ref().unwrap();
        assert_eq!(body["invoice"]["issue_date"], "2026-01-10");
        assert_eq!(body["invoice"]["due_date"], "2026-01-17");

        let bill = catalog.get("purchase-restock").unwrap().step("create-bill").unwrap();
        assert_eq!(bill.body.as_ref().unwrap()["bill"]["due_date"], "2026-02-09");
    }

    #[test]
    fn test_every_field_path_resolves_in_template() {
        let catalog = builtin_catalog_at(fixed_day());
        for workflow in catalog.workflows() {
            for step in &workflow.steps {
                for field in &step.fields {
                    let path = FieldPath::parse(&field.path).unwrap();
                    let body = step.body.as_ref().expect("fields imply a body");
                    assert!(
                        path.get(body).is_some(),
                        "{}/{}: path {} not found in template",
                        workflow.id,
                        step.id,
                        field.path
                    );
                }
            }
        }
    }

    #[test]
    fn test_conditions_name_declared_scenarios() {
        let catalog = builtin_catalog_at(fixed_day());
        for workflow in catalog.workflows() {
            for step in &workflow.steps {
                if let Some(ref condition) = step.condition {
                    assert!(workflow.scenario(condition).is_some());
                }
            }
        }
    }
}
