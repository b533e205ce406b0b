//! Ledger core schema.
//!
//! Creates the chart of accounts, fiscal calendar, journal, invoice and payment
//! tables plus the per-scope number sequences. Status columns are text guarded by
//! CHECK constraints; every amount is `NUMERIC(19,4)`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: CHART OF ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 2: FISCAL CALENDAR
        // ============================================================
        db.execute_unprepared(FISCAL_YEARS_SQL).await?;
        db.execute_unprepared(FISCAL_PERIODS_SQL).await?;

        // ============================================================
        // PART 3: JOURNAL
        // ============================================================
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;
        db.execute_unprepared(JOURNAL_LINES_SQL).await?;

        // ============================================================
        // PART 4: RECEIVABLES
        // ============================================================
        db.execute_unprepared(INVOICES_SQL).await?;
        db.execute_unprepared(INVOICE_LINES_SQL).await?;
        db.execute_unprepared(PAYMENTS_SQL).await?;
        db.execute_unprepared(PAYMENT_ALLOCATIONS_SQL).await?;

        // ============================================================
        // PART 5: DOCUMENT NUMBERS
        // ============================================================
        db.execute_unprepared(NUMBER_SEQUENCES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    organization_id UUID NOT NULL,
    parent_id UUID REFERENCES accounts(id),
    code VARCHAR(20) NOT NULL,
    name VARCHAR(255) NOT NULL,
    account_type VARCHAR(20) NOT NULL,
    normal_balance VARCHAR(10) NOT NULL,
    is_system BOOLEAN NOT NULL DEFAULT false,
    is_active BOOLEAN NOT NULL DEFAULT true,
    currency CHAR(3) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ,
    CONSTRAINT chk_account_type CHECK (
        account_type IN ('asset', 'liability', 'equity', 'revenue', 'expense')
    ),
    CONSTRAINT chk_normal_balance CHECK (normal_balance IN ('debit', 'credit')),
    CONSTRAINT chk_account_not_own_parent CHECK (parent_id IS NULL OR parent_id <> id)
);

CREATE UNIQUE INDEX uq_accounts_scope_code
    ON accounts(tenant_id, organization_id, code) WHERE deleted_at IS NULL;
CREATE INDEX idx_accounts_parent ON accounts(parent_id) WHERE parent_id IS NOT NULL;
";

const FISCAL_YEARS_SQL: &str = r"
CREATE TABLE fiscal_years (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    organization_id UUID NOT NULL,
    code VARCHAR(20) NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    is_closed BOOLEAN NOT NULL DEFAULT false,
    closed_at TIMESTAMPTZ,
    closed_by UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ,
    CONSTRAINT chk_fiscal_year_dates CHECK (end_date >= start_date)
);

CREATE UNIQUE INDEX uq_fiscal_years_scope_code
    ON fiscal_years(tenant_id, organization_id, code) WHERE deleted_at IS NULL;
CREATE INDEX idx_fiscal_years_scope_dates
    ON fiscal_years(tenant_id, organization_id, start_date, end_date);
";

const FISCAL_PERIODS_SQL: &str = r"
CREATE TABLE fiscal_periods (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    organization_id UUID NOT NULL,
    fiscal_year_id UUID NOT NULL REFERENCES fiscal_years(id),
    code VARCHAR(20) NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    status VARCHAR(10) NOT NULL DEFAULT 'open',
    closed_at TIMESTAMPTZ,
    closed_by UUID,
    locked_at TIMESTAMPTZ,
    locked_by UUID,
    deleted_at TIMESTAMPTZ,
    CONSTRAINT chk_period_dates CHECK (end_date >= start_date),
    CONSTRAINT chk_period_status CHECK (status IN ('open', 'closed', 'locked'))
);

CREATE UNIQUE INDEX uq_fiscal_periods_year_code
    ON fiscal_periods(fiscal_year_id, code) WHERE deleted_at IS NULL;
CREATE INDEX idx_fiscal_periods_scope_dates
    ON fiscal_periods(tenant_id, organization_id, start_date, end_date);
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    organization_id UUID NOT NULL,
    fiscal_period_id UUID REFERENCES fiscal_periods(id),
    entry_number VARCHAR(50) NOT NULL,
    entry_date DATE NOT NULL,
    description TEXT NOT NULL,
    currency CHAR(3) NOT NULL,
    status VARCHAR(10) NOT NULL DEFAULT 'draft',
    source_type VARCHAR(50),
    source_id UUID,
    posted_at TIMESTAMPTZ,
    posted_by UUID,
    reversed_at TIMESTAMPTZ,
    reversed_by UUID,
    reversal_entry_id UUID REFERENCES journal_entries(id),
    reverses_entry_id UUID REFERENCES journal_entries(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    created_by UUID NOT NULL,
    deleted_at TIMESTAMPTZ,
    CONSTRAINT chk_entry_status CHECK (status IN ('draft', 'posted', 'reversed')),
    CONSTRAINT chk_posted_has_period CHECK (
        status = 'draft' OR (fiscal_period_id IS NOT NULL AND posted_at IS NOT NULL)
    ),
    CONSTRAINT chk_reversed_has_link CHECK (
        status <> 'reversed' OR reversal_entry_id IS NOT NULL
    )
);

CREATE UNIQUE INDEX uq_journal_entries_scope_number
    ON journal_entries(tenant_id, organization_id, entry_number);
CREATE INDEX idx_journal_entries_scope_date
    ON journal_entries(tenant_id, organization_id, entry_date);
CREATE INDEX idx_journal_entries_drafts
    ON journal_entries(tenant_id, organization_id, entry_date)
    WHERE status = 'draft' AND deleted_at IS NULL;
";

const JOURNAL_LINES_SQL: &str = r"
CREATE TABLE journal_lines (
    id UUID PRIMARY KEY,
    journal_entry_id UUID NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    account_id UUID NOT NULL REFERENCES accounts(id),
    line_number INTEGER NOT NULL,
    debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    memo TEXT,
    CONSTRAINT chk_line_number CHECK (line_number > 0),
    CONSTRAINT chk_line_amounts_non_negative CHECK (debit >= 0 AND credit >= 0),
    CONSTRAINT chk_line_one_side CHECK ((debit = 0) <> (credit = 0)),
    UNIQUE (journal_entry_id, line_number)
);

CREATE INDEX idx_journal_lines_account ON journal_lines(account_id);
";

const INVOICES_SQL: &str = r"
CREATE TABLE invoices (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    organization_id UUID NOT NULL,
    customer_id UUID NOT NULL,
    invoice_number VARCHAR(50) NOT NULL,
    invoice_date DATE NOT NULL,
    due_date DATE NOT NULL,
    currency CHAR(3) NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'draft',
    subtotal NUMERIC(19, 4) NOT NULL,
    tax_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    discount_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_amount NUMERIC(19, 4) NOT NULL,
    paid_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    balance_due NUMERIC(19, 4) NOT NULL,
    notes TEXT,
    sent_at TIMESTAMPTZ,
    cancelled_at TIMESTAMPTZ,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_invoice_status CHECK (
        status IN ('draft', 'sent', 'partially_paid', 'paid', 'overdue', 'cancelled')
    ),
    CONSTRAINT chk_invoice_dates CHECK (due_date >= invoice_date),
    CONSTRAINT chk_invoice_total CHECK (total_amount = subtotal + tax_amount - discount_amount),
    CONSTRAINT chk_invoice_balance CHECK (balance_due = total_amount - paid_amount),
    CONSTRAINT chk_invoice_paid_range CHECK (paid_amount >= 0 AND paid_amount <= total_amount)
);

CREATE UNIQUE INDEX uq_invoices_scope_number
    ON invoices(tenant_id, organization_id, invoice_number);
CREATE INDEX idx_invoices_open_due
    ON invoices(tenant_id, organization_id, due_date)
    WHERE status IN ('sent', 'partially_paid');
";

const INVOICE_LINES_SQL: &str = r"
CREATE TABLE invoice_lines (
    id UUID PRIMARY KEY,
    invoice_id UUID NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    line_number INTEGER NOT NULL,
    description TEXT NOT NULL,
    quantity NUMERIC(19, 4) NOT NULL,
    unit_price NUMERIC(19, 4) NOT NULL,
    tax_rate NUMERIC(7, 4) NOT NULL DEFAULT 0,
    discount_rate NUMERIC(7, 4) NOT NULL DEFAULT 0,
    line_subtotal NUMERIC(19, 4) NOT NULL,
    line_tax NUMERIC(19, 4) NOT NULL,
    line_discount NUMERIC(19, 4) NOT NULL,
    line_total NUMERIC(19, 4) NOT NULL,
    account_id UUID REFERENCES accounts(id),
    CONSTRAINT chk_invoice_line_quantity CHECK (quantity > 0),
    CONSTRAINT chk_invoice_line_price CHECK (unit_price >= 0),
    CONSTRAINT chk_invoice_line_rates CHECK (
        tax_rate BETWEEN 0 AND 100 AND discount_rate BETWEEN 0 AND 100
    ),
    UNIQUE (invoice_id, line_number)
);
";

const PAYMENTS_SQL: &str = r"
CREATE TABLE payments (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    organization_id UUID NOT NULL,
    customer_id UUID NOT NULL,
    payment_number VARCHAR(50) NOT NULL,
    payment_date DATE NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    currency CHAR(3) NOT NULL,
    method VARCHAR(20) NOT NULL,
    reference VARCHAR(255),
    status VARCHAR(20) NOT NULL DEFAULT 'completed',
    voided_at TIMESTAMPTZ,
    voided_by UUID,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_payment_amount CHECK (amount > 0),
    CONSTRAINT chk_payment_status CHECK (
        status IN ('pending', 'completed', 'voided', 'refunded')
    ),
    CONSTRAINT chk_payment_method CHECK (
        method IN ('cash', 'bank_transfer', 'card', 'cheque', 'other')
    )
);

CREATE UNIQUE INDEX uq_payments_scope_number
    ON payments(tenant_id, organization_id, payment_number);
";

const PAYMENT_ALLOCATIONS_SQL: &str = r"
CREATE TABLE payment_allocations (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    organization_id UUID NOT NULL,
    payment_id UUID NOT NULL REFERENCES payments(id),
    invoice_id UUID NOT NULL REFERENCES invoices(id),
    amount NUMERIC(19, 4) NOT NULL,
    allocated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    allocated_by UUID NOT NULL,
    reversed_at TIMESTAMPTZ,
    CONSTRAINT chk_allocation_amount CHECK (amount > 0)
);

CREATE INDEX idx_payment_allocations_payment ON payment_allocations(payment_id);
CREATE INDEX idx_payment_allocations_invoice ON payment_allocations(invoice_id);
";

const NUMBER_SEQUENCES_SQL: &str = r"
CREATE TABLE number_sequences (
    tenant_id UUID NOT NULL,
    organization_id UUID NOT NULL,
    kind VARCHAR(20) NOT NULL,
    last_value BIGINT NOT NULL,
    PRIMARY KEY (tenant_id, organization_id, kind),
    CONSTRAINT chk_sequence_kind CHECK (kind IN ('journal_entry', 'invoice', 'payment')),
    CONSTRAINT chk_sequence_positive CHECK (last_value > 0)
);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS number_sequences CASCADE;
DROP TABLE IF EXISTS payment_allocations CASCADE;
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS invoice_lines CASCADE;
DROP TABLE IF EXISTS invoices CASCADE;
DROP TABLE IF EXISTS journal_lines CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS fiscal_periods CASCADE;
DROP TABLE IF EXISTS fiscal_years CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
";
