use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_users_table::Migration),
            Box::new(m20240301_000002_create_products_table::Migration),
            Box::new(m20240301_000003_create_orders_table::Migration),
            Box::new(m20240301_000004_create_order_items_table::Migration),
            Box::new(m20240301_000005_create_inventory_logs_table::Migration),
            Box::new(m20240301_000006_create_restock_requests_table::Migration),
        ]
    }
}

mod m20240301_000001_create_users_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::Role).string_len(32).not_null())
                        .col(ColumnDef::new(Users::ShopName).string().null())
                        .col(ColumnDef::new(Users::ShopAddress).string().null())
                        .col(ColumnDef::new(Users::ShopCity).string().null())
                        .col(ColumnDef::new(Users::Phone).string().null())
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Name,
        Email,
        Role,
        ShopName,
        ShopAddress,
        ShopCity,
        Phone,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_products_table {

    use super::m20240301_000001_create_users_table::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null().unique_key())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(ColumnDef::new(Products::Category).string().null())
                        .col(
                            ColumnDef::new(Products::CostPrice)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::SellingPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        // stock can never be driven below zero, whatever the writer
                        .col(
                            ColumnDef::new(Products::StockQuantity)
                                .integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(Products::StockQuantity).gte(0)),
                        )
                        .col(
                            ColumnDef::new(Products::MinThreshold)
                                .integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(Products::MinThreshold).gte(0)),
                        )
                        .col(
                            ColumnDef::new(Products::Unit)
                                .string_len(32)
                                .not_null()
                                .default("pcs"),
                        )
                        .col(ColumnDef::new(Products::SupplierName).string().null())
                        .col(ColumnDef::new(Products::SupplierEmail).string().null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Products::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_created_by")
                                .from(Products::Table, Products::CreatedBy)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category")
                        .table(Products::Table)
                        .col(Products::Category)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Sku,
        Name,
        Description,
        Category,
        CostPrice,
        SellingPrice,
        StockQuantity,
        MinThreshold,
        Unit,
        SupplierName,
        SupplierEmail,
        IsActive,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_orders_table {

    use super::m20240301_000001_create_users_table::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Orders::OrderNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::CustomerId).uuid().not_null())
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Orders::PlacedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::DispatchedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Orders::DispatchedBy).uuid().null())
                        .col(
                            ColumnDef::new(Orders::DeliveredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::ConfirmedByCustomer)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Orders::Notes).text().null())
                        .col(ColumnDef::new(Orders::ShippingAddress).text().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_customer_id")
                                .from(Orders::Table, Orders::CustomerId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_customer_id")
                        .table(Orders::Table)
                        .col(Orders::CustomerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        OrderNumber,
        CustomerId,
        TotalAmount,
        Status,
        PlacedAt,
        DispatchedAt,
        DispatchedBy,
        DeliveredAt,
        ConfirmedByCustomer,
        Notes,
        ShippingAddress,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000004_create_order_items_table {

    use super::m20240301_000003_create_orders_table::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // product_id is a snapshot reference, deliberately without a foreign key
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::LineNumber).integer().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductName).string().not_null())
                        .col(ColumnDef::new(OrderItems::Sku).string().not_null())
                        .col(
                            ColumnDef::new(OrderItems::Quantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(OrderItems::Quantity).gt(0)),
                        )
                        .col(
                            ColumnDef::new(OrderItems::Price)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::Total)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_line")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .col(OrderItems::LineNumber)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        LineNumber,
        ProductId,
        ProductName,
        Sku,
        Quantity,
        Price,
        Total,
    }
}

mod m20240301_000005_create_inventory_logs_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_inventory_logs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // The ledger outlives its product, so no foreign key on product_id
            manager
                .create_table(
                    Table::create()
                        .table(InventoryLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryLogs::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(InventoryLogs::ChangeType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryLogs::QuantityChanged)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryLogs::PreviousStock)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryLogs::NewStock).integer().not_null())
                        .col(ColumnDef::new(InventoryLogs::PerformedBy).uuid().not_null())
                        .col(ColumnDef::new(InventoryLogs::OrderId).uuid().null())
                        .col(ColumnDef::new(InventoryLogs::Notes).text().null())
                        .col(
                            ColumnDef::new(InventoryLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_logs_product_id")
                        .table(InventoryLogs::Table)
                        .col(InventoryLogs::ProductId)
                        .col(InventoryLogs::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryLogs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryLogs {
        Table,
        Id,
        ProductId,
        ChangeType,
        QuantityChanged,
        PreviousStock,
        NewStock,
        PerformedBy,
        OrderId,
        Notes,
        CreatedAt,
    }
}

mod m20240301_000006_create_restock_requests_table {

    use super::m20240301_000002_create_products_table::Products;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_restock_requests_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(RestockRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RestockRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RestockRequests::ProductId).uuid().not_null())
                        .col(ColumnDef::new(RestockRequests::ProductName).string().not_null())
                        .col(ColumnDef::new(RestockRequests::Sku).string().not_null())
                        .col(
                            ColumnDef::new(RestockRequests::CurrentStock)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RestockRequests::Threshold).integer().not_null())
                        .col(
                            ColumnDef::new(RestockRequests::RequestedQuantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(RestockRequests::RequestedQuantity).gt(0)),
                        )
                        .col(
                            ColumnDef::new(RestockRequests::SupplierEmail)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RestockRequests::SupplierName).string().null())
                        .col(
                            ColumnDef::new(RestockRequests::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RestockRequests::EmailSentAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(RestockRequests::RestockedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(RestockRequests::RestockedBy).uuid().null())
                        .col(
                            ColumnDef::new(RestockRequests::ReceivedQuantity)
                                .integer()
                                .null(),
                        )
                        .col(ColumnDef::new(RestockRequests::Notes).text().null())
                        .col(ColumnDef::new(RestockRequests::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(RestockRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RestockRequests::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_restock_requests_product_id")
                                .from(RestockRequests::Table, RestockRequests::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_restock_requests_status")
                        .table(RestockRequests::Table)
                        .col(RestockRequests::Status)
                        .to_owned(),
                )
                .await?;

            // At most one open request per product. sea-query has no partial
            // index builder, and both Postgres and SQLite accept this form.
            manager
                .get_connection()
                .execute_unprepared(
                    "CREATE UNIQUE INDEX IF NOT EXISTS uq_restock_requests_open_product \
                     ON restock_requests (product_id) \
                     WHERE status IN ('PENDING', 'EMAIL_SENT')",
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RestockRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum RestockRequests {
        Table,
        Id,
        ProductId,
        ProductName,
        Sku,
        CurrentStock,
        Threshold,
        RequestedQuantity,
        SupplierEmail,
        SupplierName,
        Status,
        EmailSentAt,
        RestockedAt,
        RestockedBy,
        ReceivedQuantity,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}
