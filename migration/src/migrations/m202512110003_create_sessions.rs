use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202512110003_create_sessions"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("sessions"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("class_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("scheduled_start")).timestamp().not_null())
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .string()
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(
                        ColumnDef::new(Alias::new("scanning_enabled"))
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Alias::new("session_token")).string().null())
                    .col(ColumnDef::new(Alias::new("started_by")).big_integer().null())
                    .col(ColumnDef::new(Alias::new("started_at")).timestamp().null())
                    .col(ColumnDef::new(Alias::new("delayed_by")).big_integer().null())
                    .col(ColumnDef::new(Alias::new("delay_reason")).text().null())
                    .col(ColumnDef::new(Alias::new("delayed_at")).timestamp().null())
                    .col(ColumnDef::new(Alias::new("new_start_time")).timestamp().null())
                    .col(ColumnDef::new(Alias::new("cancelled_by")).big_integer().null())
                    .col(ColumnDef::new(Alias::new("cancellation_reason")).text().null())
                    .col(ColumnDef::new(Alias::new("cancelled_at")).timestamp().null())
                    .col(ColumnDef::new(Alias::new("room_change_from")).string().null())
                    .col(ColumnDef::new(Alias::new("room_change_to")).string().null())
                    .col(ColumnDef::new(Alias::new("room_changed_by")).big_integer().null())
                    .col(ColumnDef::new(Alias::new("room_changed_at")).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sessions_class")
                            .from(Alias::new("sessions"), Alias::new("class_id"))
                            .to(Alias::new("classes"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("sessions")).to_owned())
            .await
    }
}
