use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202512110006_create_lecturer_verifications"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("lecturer_verifications"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("lecturer_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("attendance_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("student_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("class_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("session_id")).big_integer().not_null())
                    // Nullable: a first manual mark has no prior status.
                    .col(ColumnDef::new(Alias::new("original_status")).string().null())
                    .col(ColumnDef::new(Alias::new("verified_status")).string().not_null())
                    .col(ColumnDef::new(Alias::new("verification_reason")).text().null())
                    .col(ColumnDef::new(Alias::new("verification_notes")).text().null())
                    .col(ColumnDef::new(Alias::new("device_id")).string().null())
                    .col(ColumnDef::new(Alias::new("device_fingerprint")).string().null())
                    .col(ColumnDef::new(Alias::new("verified_at")).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lect_verif_attendance")
                            .from(Alias::new("lecturer_verifications"), Alias::new("attendance_id"))
                            .to(Alias::new("attendance_logs"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(Alias::new("lecturer_verifications"))
                    .to_owned(),
            )
            .await
    }
}
